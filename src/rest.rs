use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::http::{self, Transport};
use crate::messages::Messages;
use crate::options::ClientOptions;
use crate::Result;

/// A client for the [Courier REST API].
///
/// [Courier REST API]: https://www.courier.com/docs/reference/
#[derive(Clone, Debug)]
pub struct Courier {
    pub client: Client,
}

impl Courier {
    /// Returns a Courier client initialised with the given auth token.
    ///
    /// # Example
    ///
    /// ```
    /// # fn main() -> courier::Result<()> {
    /// let client = courier::Courier::new("<auth_token>")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(auth_token: &str) -> Result<Self> {
        ClientOptions::from(auth_token).client()
    }

    pub(crate) fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Returns a Courier client which sends every request through the given
    /// transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self::with_client(Client::new(Arc::new(transport)))
    }

    /// Returns the resource for the /messages endpoints.
    ///
    /// # Example
    ///
    /// ```
    /// # async fn run() -> courier::Result<()> {
    /// use courier::Context;
    ///
    /// let client = courier::Courier::new("<auth_token>")?;
    ///
    /// let message = client
    ///     .messages()
    ///     .get_message(&Context::background(), "1-61e0a5b8-0c08bbb11e0b3a8b4cd1e8cf")
    ///     .await?;
    ///
    /// println!("{} is {}", message.id, message.status);
    /// # Ok(())
    /// # }
    /// ```
    pub fn messages(&self) -> Messages {
        Messages::new(self.client.clone())
    }
}

/// The shared client which resources issue requests through.
///
/// Cloning is cheap: every clone shares the same transport.
#[derive(Clone, Debug)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute the request under the given context and return the raw
    /// response body.
    pub async fn send(&self, ctx: &Context, req: http::Request) -> Result<Vec<u8>> {
        // Check before execute(), which may start the request eagerly.
        ctx.err()?;
        ctx.run(self.transport.execute(req)).await
    }

    /// Execute the request under the given context and decode the JSON
    /// response body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        req: http::Request,
    ) -> Result<T> {
        let body = self.send(ctx, req).await?;
        serde_json::from_slice(&body).map_err(Into::into)
    }
}
