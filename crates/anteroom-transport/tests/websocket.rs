//! Integration tests for the WebSocket transport.
//!
//! These spin up a real WebSocket server and client to verify that text
//! frames actually flow over the network, that connection ids are
//! allocated fresh per accept, and that close is reported as `None`.

#[cfg(feature = "websocket")]
mod websocket {
    use anteroom_transport::{Connection, Transport, WebSocketTransport};
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    /// Helper: connects a tokio-tungstenite client to the given address.
    async fn connect_client(
        addr: std::net::SocketAddr,
    ) -> tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    > {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        // Port 0 lets the OS pick; local_addr tells us what it picked.
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends, client receives ---
        server_conn
            .send(r#"{"event":"room-occupancy","count":1}"#)
            .await
            .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(
            msg.into_text().unwrap().as_str(),
            r#"{"event":"room-occupancy","count":1}"#
        );

        // --- Client sends, server receives ---
        client_ws
            .send(Message::text(r#"{"event":"join-room","roomId":"x"}"#))
            .await
            .unwrap();

        let frame = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should get a frame");
        assert_eq!(frame, r#"{"event":"join-room","roomId":"x"}"#);
    }

    #[tokio::test]
    async fn test_websocket_binary_frames_accepted_as_text() {
        let mut transport =
            WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let mut client_ws = connect_client(addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws
            .send(Message::Binary(b"{\"event\":\"x\"}".to_vec().into()))
            .await
            .unwrap();

        let frame = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(frame, "{\"event\":\"x\"}");
    }

    #[tokio::test]
    async fn test_websocket_close_reported_as_none() {
        let mut transport =
            WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let server_handle =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let mut client_ws = connect_client(addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.close(None).await.unwrap();

        let got = server_conn.recv().await.expect("recv should not error");
        assert!(got.is_none(), "clean close should surface as None");
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let mut transport =
            WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let server_handle = tokio::spawn(async move {
            let a = transport.accept().await.unwrap();
            let b = transport.accept().await.unwrap();
            (a, b)
        });

        let _c1 = connect_client(addr).await;
        let _c2 = connect_client(addr).await;
        let (a, b) = server_handle.await.unwrap();

        // Reconnecting always yields a fresh transport identity.
        assert_ne!(a.id(), b.id());
    }
}
