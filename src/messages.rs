use chrono::prelude::*;
use futures::stream::{self, BoxStream, StreamExt};
use log::debug;
use serde::Deserialize;

use crate::context::Context;
use crate::error::*;
use crate::json::{self, Value};
use crate::{http, rest, Result};

/// The delivery status of a message as reported by the [messages endpoint].
///
/// [messages endpoint]: https://www.courier.com/docs/reference/messages/
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Message {
    #[serde(deserialize_with = "json::nullable")]
    pub id: String,
    #[serde(deserialize_with = "json::nullable")]
    pub event: String,
    #[serde(deserialize_with = "json::nullable")]
    pub notification: String,
    #[serde(deserialize_with = "json::nullable")]
    pub status: String,
    #[serde(deserialize_with = "json::nullable")]
    pub error: String,
    #[serde(deserialize_with = "json::nullable")]
    pub reason: String,
    #[serde(deserialize_with = "json::nullable")]
    pub recipient: String,

    // Epoch milliseconds, zero when the message hasn't reached that state.
    #[serde(deserialize_with = "json::nullable")]
    pub enqueued: i64,
    #[serde(deserialize_with = "json::nullable")]
    pub delivered: i64,
    #[serde(deserialize_with = "json::nullable")]
    pub sent: i64,
    #[serde(deserialize_with = "json::nullable")]
    pub clicked: i64,

    #[serde(deserialize_with = "json::nullable")]
    pub providers: Vec<ProviderAttempt>,
    #[serde(deserialize_with = "json::nullable")]
    pub tags: Vec<String>,
}

impl Message {
    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.enqueued)
    }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.delivered)
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.sent)
    }

    pub fn clicked_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.clicked)
    }
}

/// A single attempt to deliver a message through an integration provider.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderAttempt {
    pub channel: Option<ProviderChannel>,
    #[serde(deserialize_with = "json::nullable")]
    pub error: String,
    #[serde(deserialize_with = "json::nullable")]
    pub status: String,
    #[serde(deserialize_with = "json::nullable")]
    pub delivered: i64,
    #[serde(deserialize_with = "json::nullable")]
    pub sent: i64,
    #[serde(deserialize_with = "json::nullable")]
    pub clicked: i64,
    #[serde(deserialize_with = "json::nullable")]
    pub provider: String,

    /// The raw response of the provider. Its shape varies per provider.
    pub provider_response: Value,

    /// A provider specific reference to the delivery, e.g. an SMS ID.
    pub reference: Value,
}

impl ProviderAttempt {
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.delivered)
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.sent)
    }

    pub fn clicked_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.clicked)
    }
}

/// The channel used by a [`ProviderAttempt`], if any.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderChannel {
    pub key:      Option<String>,
    pub name:     Option<String>,
    pub template: Option<String>,
}

/// The paging metadata of a [`MessagePage`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Paging {
    /// An opaque token to pass as the cursor of the next request.
    pub cursor: Option<String>,
    #[serde(deserialize_with = "json::nullable")]
    pub more: bool,
}

/// A single page of a /messages listing.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(deserialize_with = "json::nullable")]
    pub paging: Paging,
    #[serde(deserialize_with = "json::nullable")]
    pub results: Vec<Message>,
}

impl MessagePage {
    /// Returns whether the server has more results after this page.
    pub fn has_more(&self) -> bool {
        self.paging.more
    }

    /// Returns the cursor of the next page, if there is one. This is `None`
    /// when `more` is set but the server sent no usable cursor.
    pub fn next_cursor(&self) -> Option<&str> {
        if !self.paging.more {
            return None;
        }
        self.paging.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

fn timestamp(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

/// The /messages resource of the Courier API.
#[derive(Clone, Debug)]
pub struct Messages {
    client: rest::Client,
}

impl Messages {
    pub fn new(client: rest::Client) -> Self {
        Self { client }
    }

    /// Sends a GET request to /messages/{id} and returns the message.
    ///
    /// # Errors
    ///
    /// Fails without sending a request if `message_id` is empty or a dot
    /// segment (`.` or `..`), and otherwise with whatever error the transport or JSON decoding reports.
    pub async fn get_message(&self, ctx: &Context, message_id: &str) -> Result<Message> {
        if message_id.is_empty() {
            return Err(error!(
                ErrorKind::RequestConstruction,
                "message ID must not be empty"
            ));
        }

        // URL parsing collapses dot segments, even percent-encoded ones.
        if message_id == "." || message_id == ".." {
            return Err(error!(
                ErrorKind::RequestConstruction,
                format!("invalid message ID: {}", message_id)
            ));
        }

        debug!("get message {}", message_id);
        let req = http::Request::get(format!("/messages/{}", encode_segment(message_id)));
        self.client.send_json(ctx, req).await
    }

    /// Sends a GET request to /messages and returns a single page of
    /// messages.
    ///
    /// An empty `cursor` requests the first page and an empty `tags` leaves
    /// the listing unfiltered; neither is sent in that case.
    pub async fn get_messages(&self, ctx: &Context, cursor: &str, tags: &str) -> Result<MessagePage> {
        self.list().cursor(cursor).tags(tags).send(ctx).await
    }

    /// Start building a GET request to /messages.
    ///
    /// Returns a ListBuilder which is used to set filters before sending the
    /// request.
    ///
    /// # Example
    ///
    /// ```
    /// # async fn run() -> courier::Result<()> {
    /// use courier::Context;
    /// use futures::TryStreamExt;
    ///
    /// let client = courier::Courier::new("<auth_token>")?;
    /// let ctx = Context::background();
    ///
    /// let mut pages = client
    ///     .messages()
    ///     .list()
    ///     .status("UNDELIVERABLE")
    ///     .tags("billing")
    ///     .pages(&ctx);
    ///
    /// while let Some(page) = pages.try_next().await? {
    ///     for message in page.results {
    ///         println!("{}: {}", message.id, message.reason);
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn list(&self) -> ListBuilder {
        ListBuilder::new(self.client.clone())
    }
}

/// Percent-encode a value for use as a single URL path segment.
fn encode_segment(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// A builder to construct a /messages listing request.
#[derive(Clone, Debug)]
pub struct ListBuilder {
    client:       rest::Client,
    cursor:       String,
    tags:         String,
    event:        String,
    list:         String,
    notification: String,
    recipient:    String,
    status:       String,
}

impl ListBuilder {
    fn new(client: rest::Client) -> Self {
        Self {
            client,
            cursor: String::new(),
            tags: String::new(),
            event: String::new(),
            list: String::new(),
            notification: String::new(),
            recipient: String::new(),
            status: String::new(),
        }
    }

    /// Continue a listing from the cursor of a previous page.
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    /// Filter by tags, passed through to the API as given.
    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn list(mut self, list: impl Into<String>) -> Self {
        self.list = list.into();
        self
    }

    pub fn notification(mut self, notification: impl Into<String>) -> Self {
        self.notification = notification.into();
        self
    }

    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    fn request(&self, cursor: &str) -> http::Request {
        http::Request::get("/messages")
            .param_if_set("cursor", cursor)
            .param_if_set("event", &self.event)
            .param_if_set("list", &self.list)
            .param_if_set("notification", &self.notification)
            .param_if_set("recipient", &self.recipient)
            .param_if_set("status", &self.status)
            .param_if_set("tags", &self.tags)
    }

    /// Send the request and return a single page of messages.
    pub async fn send(self, ctx: &Context) -> Result<MessagePage> {
        let req = self.request(&self.cursor);
        debug!("list messages {:?}", req.params);
        self.client.send_json(ctx, req).await
    }

    /// Returns a stream of pages, starting at the builder's cursor.
    ///
    /// Each page is requested when the stream is polled, so the caller
    /// decides how far to iterate. The stream ends after the last page or
    /// the first error.
    pub fn pages(self, ctx: &Context) -> BoxStream<'static, Result<MessagePage>> {
        let ctx = ctx.clone();
        let cursor = self.cursor.clone();

        stream::unfold(Some((self, cursor)), move |state| {
            let ctx = ctx.clone();
            async move {
                let (builder, cursor) = match state {
                    Some(state) => state,
                    None => return None,
                };

                let req = builder.request(&cursor);
                match builder.client.send_json::<MessagePage>(&ctx, req).await {
                    Ok(page) => {
                        let next = page.next_cursor().map(ToString::to_string);
                        let state = next.map(|cursor| (builder, cursor));
                        Some((Ok(page), state))
                    }
                    Err(err) => Some((Err(err), None)),
                }
            }
        })
        .boxed()
    }
}
