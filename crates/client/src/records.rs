use std::collections::BTreeMap;

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::debug;

use onboard_core::{
    Attachment, FieldValue, Fields, RecordKey, RemoteId, Section, SectionRecord, UserId,
};

use crate::{Error, OnboardClient, error_from_response, segment};

/// A record as the service returns it from a section fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    #[serde(alias = "uuid")]
    pub id: RemoteId,
    /// Logical key of the record within its section, when the service
    /// echoes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_key: Option<RecordKey>,
    #[serde(default)]
    pub fields: Fields,
    /// Stored file paths by slot.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl RemoteRecord {
    /// Convert into a [`SectionRecord`]. Records without an echoed key fall
    /// back to `fallback_key`, or to their remote id when none is given.
    pub fn into_section_record(self, fallback_key: Option<&str>) -> SectionRecord {
        let key = self
            .record_key
            .or_else(|| fallback_key.map(RecordKey::from))
            .unwrap_or_else(|| RecordKey::new(self.id.as_str()));
        let mut record = SectionRecord::new(key).with_remote_id(self.id);
        record.fields = self.fields;
        for (slot, path) in self.files {
            record = record.with_attachment(Attachment::stored(slot, path));
        }
        record
    }
}

/// Reply to a create or update call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAck {
    /// Assigned identifier. Always present after a create.
    #[serde(default, alias = "uuid", skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    /// Stored file paths by slot.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

/// Build the multipart body shared by create and update.
///
/// Unset fields are left out. Every pending attachment becomes a file part
/// named after its slot.
fn record_form(user: &UserId, record: &SectionRecord) -> Result<Form, Error> {
    let mut form = Form::new()
        .text("user_uuid", user.to_string())
        .text("record_key", record.key.to_string());

    for (name, value) in &record.fields {
        if matches!(value, FieldValue::Unset) {
            continue;
        }
        form = form.text(name.clone(), value.to_string());
    }

    for attachment in record.attachments.values() {
        let Some(file) = &attachment.pending else {
            continue;
        };
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| Error::Configuration(format!("invalid mime type: {e}")))?;
        form = form.part(attachment.slot.clone(), part);
    }

    Ok(form)
}

async fn read_ack(response: reqwest::Response) -> Result<RemoteAck, Error> {
    let body = response
        .text()
        .await
        .map_err(|e| Error::Deserialization(e.to_string()))?;
    if body.trim().is_empty() {
        return Ok(RemoteAck::default());
    }
    serde_json::from_str(&body).map_err(|e| Error::Deserialization(e.to_string()))
}

impl OnboardClient {
    fn section_url(&self, section: Section) -> String {
        self.url(self.routes.route(section))
    }

    /// Fetch the records a user already has for a section.
    ///
    /// A 404 or a body that is not a list means "nothing yet" and yields an
    /// empty list.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> Result<(), onboard_client::Error> {
    /// use onboard_client::OnboardClient;
    /// use onboard_core::Section;
    ///
    /// let client = OnboardClient::new("http://localhost:8080");
    /// let records = client.fetch_records(Section::Education, &"user-1".into()).await?;
    /// for record in records {
    ///     println!("{} {:?}", record.id, record.record_key);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_records(
        &self,
        section: Section,
        user: &UserId,
    ) -> Result<Vec<RemoteRecord>, Error> {
        let url = format!("{}/{}", self.section_url(section), segment(user));
        let response = self
            .add_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        let items = match body {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut map) => match map.remove("data") {
                Some(serde_json::Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        debug!(section = %section, count = items.len(), "fetched existing records");

        items
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| Error::Deserialization(e.to_string()))
            })
            .collect()
    }

    /// Create a record. The reply carries the assigned identifier and the
    /// paths of any uploaded files.
    pub async fn create_record(
        &self,
        section: Section,
        user: &UserId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, Error> {
        let url = self.section_url(section);
        let response = self
            .add_auth(self.client.post(&url))
            .multipart(record_form(user, record)?)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let ack = read_ack(response).await?;
        if ack.id.is_none() {
            return Err(Error::Deserialization(
                "create response carried no record id".into(),
            ));
        }
        Ok(ack)
    }

    /// Update a previously created record.
    ///
    /// A 409 reply becomes [`Error::Conflict`] carrying the server message.
    pub async fn update_record(
        &self,
        section: Section,
        user: &UserId,
        remote_id: &RemoteId,
        record: &SectionRecord,
    ) -> Result<RemoteAck, Error> {
        let url = format!("{}/{}", self.section_url(section), segment(remote_id));
        let response = self
            .add_auth(self.client.put(&url))
            .multipart(record_form(user, record)?)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        read_ack(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_record_uses_echoed_key() {
        let remote: RemoteRecord = serde_json::from_str(
            r#"{"id": "r-1", "record_key": "permanent", "fields": {"city": "Pune"},
                "files": {"proof": "/s/proof.pdf"}}"#,
        )
        .unwrap();
        let record = remote.into_section_record(Some("ignored"));
        assert_eq!(record.key.as_str(), "permanent");
        assert_eq!(record.remote_id.as_deref(), Some("r-1"));
        assert_eq!(record.field("city"), &FieldValue::text("Pune"));
        assert_eq!(
            record.attachments["proof"].server_path.as_deref(),
            Some("/s/proof.pdf")
        );
    }

    #[test]
    fn remote_record_key_fallbacks() {
        let remote: RemoteRecord = serde_json::from_str(r#"{"uuid": "r-2"}"#).unwrap();
        assert_eq!(
            remote.clone().into_section_record(Some("personal")).key.as_str(),
            "personal"
        );
        assert_eq!(remote.into_section_record(None).key.as_str(), "r-2");
    }

    #[test]
    fn ack_defaults() {
        let ack: RemoteAck = serde_json::from_str("{}").unwrap();
        assert!(ack.id.is_none());
        assert!(ack.files.is_empty());
    }
}
