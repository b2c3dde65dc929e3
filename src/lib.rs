//! A Rust client for the [Courier] messages API.
//!
//! # Example
//!
//! ```
//! # async fn run() -> courier::Result<()> {
//! use courier::{ClientOptions, Context};
//! use std::time::Duration;
//!
//! let client = ClientOptions::from_env().client()?;
//! let ctx = Context::with_timeout(Duration::from_secs(5));
//!
//! let page = client.messages().get_messages(&ctx, "", "billing").await?;
//! for message in &page.results {
//!     println!("{} {}", message.id, message.status);
//! }
//!
//! if let Some(cursor) = page.next_cursor() {
//!     let next = client.messages().get_messages(&ctx, cursor, "billing").await?;
//!     println!("next page has {} messages", next.results.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [Courier]: https://www.courier.com

#[macro_use]
pub mod error;
pub mod context;
pub mod http;
pub mod json;
pub mod log;
pub mod messages;
pub mod options;
pub mod rest;

pub use context::Context;
pub use error::{ErrorInfo, ErrorKind};
pub use messages::{Message, MessagePage, Messages, Paging, ProviderAttempt, ProviderChannel};
pub use options::ClientOptions;
pub use rest::Courier;

/// A `Result` alias where the `Err` case is `courier::ErrorInfo`.
pub type Result<T> = std::result::Result<T, ErrorInfo>;

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use futures::TryStreamExt;
    use serde_json::json;

    use super::*;
    use crate::http::{Request, ResponseFuture, Transport};

    /// A transport which records every request and replies with queued
    /// responses, or never replies when the queue is empty.
    #[derive(Debug, Default)]
    struct MockTransport {
        requests:  Mutex<Vec<Request>>,
        responses: Mutex<VecDeque<Result<Vec<u8>>>>,
    }

    impl MockTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn reply(self: &Arc<Self>, body: serde_json::Value) -> Arc<Self> {
            self.responses
                .lock()
                .unwrap()
                .push_back(Ok(body.to_string().into_bytes()));
            self.clone()
        }

        fn reply_raw(self: &Arc<Self>, res: Result<Vec<u8>>) -> Arc<Self> {
            self.responses.lock().unwrap().push_back(res);
            self.clone()
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn execute(&self, req: Request) -> ResponseFuture<'_> {
            self.requests.lock().unwrap().push(req);
            let res = self.responses.lock().unwrap().pop_front();
            Box::pin(async move {
                match res {
                    Some(res) => res,
                    None => futures::future::pending().await,
                }
            })
        }
    }

    fn messages(transport: &Arc<MockTransport>) -> Messages {
        Messages::new(rest::Client::new(transport.clone()))
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn empty_page() -> serde_json::Value {
        json!({ "paging": { "more": false }, "results": [] })
    }

    #[tokio::test]
    async fn get_message_returns_the_decoded_message() -> Result<()> {
        let transport = MockTransport::new().reply(json!({
            "id": "msg_1",
            "status": "SENT",
            "providers": [{ "provider": "sms-provider", "status": "DELIVERED", "sent": 1690000000 }]
        }));

        let message = messages(&transport)
            .get_message(&Context::background(), "msg_1")
            .await?;

        assert_eq!(message.id, "msg_1");
        assert_eq!(message.status, "SENT");
        assert_eq!(message.providers.len(), 1);
        assert_eq!(message.providers[0].provider, "sms-provider");
        assert_eq!(message.providers[0].sent, 1690000000);

        assert_eq!(transport.requests(), vec![Request::get("/messages/msg_1")]);

        Ok(())
    }

    #[tokio::test]
    async fn get_message_escapes_the_id() -> Result<()> {
        let transport = MockTransport::new().reply(json!({ "id": "a/b" }));

        messages(&transport)
            .get_message(&Context::background(), "a/b")
            .await?;

        assert_eq!(transport.requests()[0].path, "/messages/a%2Fb");

        Ok(())
    }

    #[tokio::test]
    async fn get_message_with_empty_id_sends_nothing() {
        let transport = MockTransport::new();

        let err = messages(&transport)
            .get_message(&Context::background(), "")
            .await
            .expect_err("Expected request construction error");

        assert_eq!(err.kind, ErrorKind::RequestConstruction);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn get_message_with_dot_segment_id_sends_nothing() {
        let transport = MockTransport::new().reply(empty_page());

        for id in [".", ".."] {
            let err = messages(&transport)
                .get_message(&Context::background(), id)
                .await
                .expect_err("Expected request construction error");
            assert_eq!(err.kind, ErrorKind::RequestConstruction);
        }

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn get_message_with_dots_inside_the_id_is_sent() -> Result<()> {
        let transport = MockTransport::new().reply(json!({ "id": "a..b" }));

        messages(&transport)
            .get_message(&Context::background(), "a..b")
            .await?;

        assert_eq!(transport.requests()[0].path, "/messages/a..b");

        Ok(())
    }

    #[tokio::test]
    async fn get_messages_without_cursor_or_tags_sends_no_params() -> Result<()> {
        let transport = MockTransport::new().reply(empty_page());

        let page = messages(&transport)
            .get_messages(&Context::background(), "", "")
            .await?;

        assert!(page.results.is_empty());
        assert_eq!(transport.requests(), vec![Request::get("/messages")]);

        Ok(())
    }

    #[tokio::test]
    async fn get_messages_sends_only_the_params_which_are_set() -> Result<()> {
        let transport = MockTransport::new()
            .reply(empty_page())
            .reply(empty_page())
            .reply(empty_page());
        let ctx = Context::background();
        let messages = messages(&transport);

        messages.get_messages(&ctx, "abc", "").await?;
        messages.get_messages(&ctx, "", "billing onboarding").await?;
        messages.get_messages(&ctx, "abc", "billing").await?;

        let requests = transport.requests();
        assert_eq!(requests[0].params, params(&[("cursor", "abc")]));
        assert_eq!(
            requests[1].params,
            params(&[("tags", "billing onboarding")])
        );
        assert_eq!(
            requests[2].params,
            params(&[("cursor", "abc"), ("tags", "billing")])
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_messages_query_string_is_url_encoded() -> Result<()> {
        let transport = MockTransport::new().reply(empty_page()).reply(empty_page());
        let ctx = Context::background();
        let messages = messages(&transport);

        messages.get_messages(&ctx, "abc", "").await?;
        messages.get_messages(&ctx, "", "a&b=c").await?;

        let http = http::Client::new(
            reqwest::Client::new(),
            "https://api.courier.com".parse().unwrap(),
            "token".to_string(),
        );
        let requests = transport.requests();
        assert_eq!(http.url(&requests[0])?.query(), Some("cursor=abc"));
        assert_eq!(http.url(&requests[1])?.query(), Some("tags=a%26b%3Dc"));

        Ok(())
    }

    #[tokio::test]
    async fn get_messages_decodes_paging() -> Result<()> {
        let transport = MockTransport::new().reply(json!({
            "paging": { "cursor": "next-cursor", "more": true },
            "results": [{ "id": "msg_1" }, { "id": "msg_2", "unknown": {"a": [1]} }],
            "unknownTopLevel": true
        }));

        let page = messages(&transport)
            .get_messages(&Context::background(), "", "")
            .await?;

        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].id, "msg_2");
        assert_eq!(page.next_cursor(), Some("next-cursor"));

        Ok(())
    }

    #[tokio::test]
    async fn transport_errors_are_returned_unchanged() {
        let transport = MockTransport::new().reply_raw(Err(ErrorInfo::new(
            ErrorKind::HttpStatus,
            "Message Not Found",
            Some(404),
        )));

        let err = messages(&transport)
            .get_message(&Context::background(), "missing")
            .await
            .expect_err("Expected HTTP status error");

        assert_eq!(err.kind, ErrorKind::HttpStatus);
        assert_eq!(err.status_code, Some(404));
        assert_eq!(err.message, "Message Not Found");
    }

    #[tokio::test]
    async fn malformed_bodies_are_decode_errors() {
        let transport = MockTransport::new()
            .reply_raw(Ok(b"<html>".to_vec()))
            .reply(json!({ "results": "not a list" }));
        let ctx = Context::background();

        let err = messages(&transport)
            .get_message(&ctx, "msg_1")
            .await
            .expect_err("Expected decode error");
        assert_eq!(err.kind, ErrorKind::Decode);

        let err = messages(&transport)
            .get_messages(&ctx, "", "")
            .await
            .expect_err("Expected decode error");
        assert_eq!(err.kind, ErrorKind::Decode);
    }

    #[tokio::test]
    async fn cancelled_context_aborts_both_operations() {
        let transport = MockTransport::new().reply(json!({ "id": "msg_1" }));
        let messages = messages(&transport);
        let ctx = Context::background();
        ctx.cancel();

        let err = messages
            .get_message(&ctx, "msg_1")
            .await
            .expect_err("Expected cancellation");
        assert_eq!(err.kind, ErrorKind::Cancelled);

        let err = messages
            .get_messages(&ctx, "", "")
            .await
            .expect_err("Expected cancellation");
        assert_eq!(err.kind, ErrorKind::Cancelled);

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn cancellation_during_the_call_aborts_it() {
        // No queued response: the transport never replies.
        let transport = MockTransport::new();
        let ctx = Context::background();
        let canceller = ctx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = messages(&transport)
            .get_messages(&ctx, "", "")
            .await
            .expect_err("Expected cancellation");

        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn deadline_aborts_the_call() {
        let transport = MockTransport::new();

        let err = messages(&transport)
            .get_message(&Context::with_timeout(Duration::from_millis(10)), "msg_1")
            .await
            .expect_err("Expected deadline error");

        assert_eq!(err.kind, ErrorKind::DeadlineExceeded);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_resource() -> Result<()> {
        let transport = MockTransport::new();
        for n in 0..8 {
            transport.reply(json!({ "id": "msg", "tags": [n.to_string()] }));
        }
        let messages = messages(&transport);
        let ctx = Context::background();

        let results = futures::future::try_join_all(
            (0..8).map(|n| {
                let messages = messages.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move { messages.get_message(&ctx, &format!("msg_{}", n)).await })
            }),
        )
        .await
        .expect("Expected tasks to complete");

        assert_eq!(results.len(), 8);
        for res in results {
            assert_eq!(res?.id, "msg");
        }
        assert_eq!(transport.requests().len(), 8);

        Ok(())
    }

    #[tokio::test]
    async fn list_builder_sends_every_filter() -> Result<()> {
        let transport = MockTransport::new().reply(empty_page());

        messages(&transport)
            .list()
            .event("order-shipped")
            .list("beta-users")
            .notification("welcome")
            .recipient("user_1")
            .status("")
            .tags("billing")
            .send(&Context::background())
            .await?;

        assert_eq!(
            transport.requests()[0].params,
            params(&[
                ("event", "order-shipped"),
                ("list", "beta-users"),
                ("notification", "welcome"),
                ("recipient", "user_1"),
                ("tags", "billing"),
            ])
        );

        Ok(())
    }

    #[tokio::test]
    async fn pages_follow_the_cursor_until_no_more() -> Result<()> {
        let transport = MockTransport::new()
            .reply(json!({
                "paging": { "cursor": "c1", "more": true },
                "results": [{ "id": "msg_1" }]
            }))
            .reply(json!({
                "paging": { "cursor": "c2", "more": true },
                "results": [{ "id": "msg_2" }]
            }))
            .reply(json!({
                "paging": { "cursor": null, "more": false },
                "results": [{ "id": "msg_3" }]
            }));

        let pages = messages(&transport)
            .list()
            .tags("billing")
            .pages(&Context::background())
            .try_collect::<Vec<_>>()
            .await?;

        let ids: Vec<_> = pages
            .iter()
            .flat_map(|p| p.results.iter().map(|m| m.id.as_str()))
            .collect();
        assert_eq!(ids, vec!["msg_1", "msg_2", "msg_3"]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].params, params(&[("tags", "billing")]));
        assert_eq!(
            requests[1].params,
            params(&[("cursor", "c1"), ("tags", "billing")])
        );
        assert_eq!(
            requests[2].params,
            params(&[("cursor", "c2"), ("tags", "billing")])
        );

        Ok(())
    }

    #[tokio::test]
    async fn pages_are_only_fetched_when_polled() -> Result<()> {
        let transport = MockTransport::new().reply(json!({
            "paging": { "cursor": "c1", "more": true },
            "results": []
        }));

        let mut pages = messages(&transport).list().pages(&Context::background());
        assert!(transport.requests().is_empty());

        let first = pages.try_next().await?.expect("Expected a page");
        assert!(first.has_more());
        assert_eq!(transport.requests().len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn pages_stop_after_an_error() {
        let transport = MockTransport::new()
            .reply_raw(Err(ErrorInfo::new(ErrorKind::Transport, "connection reset", None)));

        let pages: Vec<_> = futures::StreamExt::collect(
            messages(&transport).list().pages(&Context::background()),
        )
        .await;

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].as_ref().unwrap_err().kind, ErrorKind::Transport);
    }

    #[tokio::test]
    async fn courier_client_gets_message_over_http() -> Result<()> {
        let (base_url, server) = http::tests::respond_once(
            "200 OK",
            r#"{"id":"msg_1","status":"SENT","providers":[{"provider":"sms-provider","status":"DELIVERED","sent":1690000000}]}"#,
        )
        .await;

        let client = ClientOptions::from("token").base_url(base_url).client()?;
        let message = client
            .messages()
            .get_message(&Context::background(), "msg_1")
            .await?;

        assert_eq!(message.id, "msg_1");
        assert_eq!(message.providers[0].sent, 1690000000);

        let head = server.await.expect("Expected server to respond");
        assert!(head.starts_with("GET /messages/msg_1 HTTP/1.1\r\n"));

        Ok(())
    }

    #[tokio::test]
    async fn courier_client_lists_messages_over_http() -> Result<()> {
        let (base_url, server) = http::tests::respond_once(
            "200 OK",
            r#"{"paging":{"cursor":null,"more":false},"results":[]}"#,
        )
        .await;

        let client = ClientOptions::from("token").base_url(base_url).client()?;
        client
            .messages()
            .get_messages(&Context::background(), "abc", "")
            .await?;

        let head = server.await.expect("Expected server to respond");
        assert!(head.starts_with("GET /messages?cursor=abc HTTP/1.1\r\n"));

        Ok(())
    }

    #[test]
    fn courier_with_transport_uses_the_given_transport() {
        let transport = MockTransport::new().reply(json!({ "id": "msg_1" }));
        let client = Courier::with_transport(transport.clone());

        let rt = tokio::runtime::Runtime::new().unwrap();
        let message = rt
            .block_on(client.messages().get_message(&Context::background(), "msg_1"))
            .unwrap();

        assert_eq!(message.id, "msg_1");
        assert_eq!(transport.requests().len(), 1);
    }
}
