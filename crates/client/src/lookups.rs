use serde::Deserialize;
use serde::de::DeserializeOwned;

use onboard_core::{Country, EducationMapping, IdentityType};

use crate::{Error, OnboardClient, error_from_response, segment};

/// Master-data listings arrive either as a bare array or wrapped in a
/// `data` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Enveloped { data: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Enveloped { data: items } => items,
        }
    }
}

impl OnboardClient {
    async fn get_listing<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        let url = self.url(path);
        let response = self
            .add_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let listing = response
            .json::<Listing<T>>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))?;
        Ok(listing.into_vec())
    }

    /// List the active countries.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> Result<(), onboard_client::Error> {
    /// use onboard_client::OnboardClient;
    ///
    /// let client = OnboardClient::new("http://localhost:8080");
    /// for country in client.countries().await? {
    ///     println!("{} {}", country.country_uuid, country.country_name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn countries(&self) -> Result<Vec<Country>, Error> {
        let all: Vec<Country> = self.get_listing("/masters/country").await?;
        Ok(all.into_iter().filter(|c| c.is_active).collect())
    }

    /// Identity document types mapped to a country.
    pub async fn identity_types(&self, country_uuid: &str) -> Result<Vec<IdentityType>, Error> {
        let path = format!(
            "/identity/country-mapping/identities/{}",
            segment(country_uuid)
        );
        self.get_listing(&path).await
    }

    /// Education documents mapped to a country.
    pub async fn education_mappings(
        &self,
        country_uuid: &str,
    ) -> Result<Vec<EducationMapping>, Error> {
        let path = format!("/education/country-mapping/{}", segment(country_uuid));
        self.get_listing(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_accepts_both_shapes() {
        let bare: Listing<u32> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(bare.into_vec(), vec![1, 2]);

        let wrapped: Listing<u32> = serde_json::from_str(r#"{"data": [3]}"#).unwrap();
        assert_eq!(wrapped.into_vec(), vec![3]);
    }
}
