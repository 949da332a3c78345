use serde::Deserialize;
use tracing::debug;

use onboard_core::{SessionToken, UserId};

use crate::{Error, OnboardClient, error_from_response, segment};

/// Token verification reply. Services answer either with the bare user id
/// or with an object carrying it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenVerification {
    Plain(UserId),
    Wrapped { user_uuid: UserId },
    Nested { data: Box<TokenVerification> },
}

impl TokenVerification {
    fn into_user(self) -> UserId {
        match self {
            Self::Plain(user) | Self::Wrapped { user_uuid: user } => user,
            Self::Nested { data } => data.into_user(),
        }
    }
}

impl OnboardClient {
    /// Resolve an onboarding link token to the user it belongs to.
    ///
    /// An unknown or expired token yields a 4xx [`Error::Http`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> Result<(), onboard_client::Error> {
    /// use onboard_client::OnboardClient;
    ///
    /// let client = OnboardClient::new("http://localhost:8080");
    /// let user = client.verify_token(&"abc123".into()).await?;
    /// println!("token belongs to {user}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn verify_token(&self, token: &SessionToken) -> Result<UserId, Error> {
        let url = self.url(&format!("/token-verification/{}", segment(token)));
        let response = self
            .add_auth(self.client.post(&url))
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let user = response
            .json::<TokenVerification>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))?
            .into_user();
        if user.is_empty() {
            return Err(Error::Deserialization(
                "token verification returned an empty user id".into(),
            ));
        }
        debug!(user = %user, "token verified");
        Ok(user)
    }

    /// Signal that every section of the user's onboarding is complete.
    pub async fn submit(&self, user: &UserId) -> Result<(), Error> {
        #[derive(serde::Serialize)]
        struct Body<'a> {
            user_uuid: &'a str,
        }

        let url = self.url("/hr/candidate/submit");
        let response = self
            .add_auth(self.client.post(&url))
            .json(&Body { user_uuid: user })
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}
