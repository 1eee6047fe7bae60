use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::*;

async fn write_raw_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) {
	let json_bytes = serde_json::to_vec(message).unwrap();
	let length = json_bytes.len() as u32;
	writer.write_all(&length.to_le_bytes()).await.unwrap();
	writer.write_all(&json_bytes).await.unwrap();
	writer.flush().await.unwrap();
}

#[tokio::test]
async fn test_send_writes_length_prefixed_frame() {
	let (mut peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, _peer_write) = tokio::io::duplex(1024);

	let (transport, _rx) = PipeTransport::new(transport_write, transport_read);
	let (mut sender, _receiver) = transport.into_parts();

	let message = serde_json::json!({
		"id": 1,
		"method": "pushRoute",
		"params": {"uniqueId": "A"}
	});
	Transport::send(&mut sender, message.clone()).await.unwrap();

	let mut len_buf = [0u8; 4];
	peer_read.read_exact(&mut len_buf).await.unwrap();
	let length = u32::from_le_bytes(len_buf) as usize;

	let mut msg_buf = vec![0u8; length];
	peer_read.read_exact(&mut msg_buf).await.unwrap();

	let received: Value = serde_json::from_slice(&msg_buf).unwrap();
	assert_eq!(received, message);
}

#[tokio::test]
async fn test_multiple_messages_in_sequence() {
	let (_peer_read, transport_write) = tokio::io::duplex(4096);
	let (transport_read, mut peer_write) = tokio::io::duplex(4096);

	let (mut transport, mut rx) = PipeTransport::new(transport_write, transport_read);
	let read_task = tokio::spawn(async move { transport.run().await });

	let messages = vec![
		serde_json::json!({"id": 1, "method": "onContainerShow"}),
		serde_json::json!({"id": 2, "method": "onContainerHide"}),
		serde_json::json!({"id": 3, "method": "removeRoute"}),
	];
	for msg in &messages {
		write_raw_frame(&mut peer_write, msg).await;
	}

	for expected in &messages {
		let received = rx.recv().await.unwrap();
		assert_eq!(&received, expected);
	}

	drop(peer_write);
	let result = read_task.await.unwrap();
	assert!(result.is_ok());
}

#[tokio::test]
async fn test_large_message() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024 * 1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024 * 1024);

	let (mut transport, mut rx) = PipeTransport::new(transport_write, transport_read);
	let read_task = tokio::spawn(async move { transport.run().await });

	let large_message = serde_json::json!({
		"id": 1,
		"params": {"arguments": {"blob": "x".repeat(100_000)}}
	});
	write_raw_frame(&mut peer_write, &large_message).await;

	let received = rx.recv().await.unwrap();
	assert_eq!(received, large_message);

	drop(peer_write);
	let _ = read_task.await;
}

#[tokio::test]
async fn test_truncated_length_prefix() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(transport_write, transport_read);

	peer_write.write_all(&[0x01, 0x02]).await.unwrap();
	peer_write.flush().await.unwrap();
	drop(peer_write);

	let result = transport.run().await;
	assert!(result.is_err());
	assert!(
		result
			.unwrap_err()
			.to_string()
			.contains("truncated length prefix")
	);
}

#[tokio::test]
async fn test_oversized_frame_rejected() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, mut peer_write) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(transport_write, transport_read);

	let length = (MAX_FRAME_SIZE as u32) + 1;
	peer_write.write_all(&length.to_le_bytes()).await.unwrap();
	peer_write.flush().await.unwrap();

	let result = transport.run().await;
	assert!(matches!(result, Err(Error::ProtocolError(_))));
}

#[tokio::test]
async fn test_clean_close_ends_reader() {
	let (_peer_read, transport_write) = tokio::io::duplex(1024);
	let (transport_read, peer_write) = tokio::io::duplex(1024);

	let (mut transport, _rx) = PipeTransport::new(transport_write, transport_read);
	drop(peer_write);

	let read_task = tokio::spawn(async move { transport.run().await });
	let result = read_task.await.unwrap();
	assert!(result.is_ok());
}

#[tokio::test]
async fn test_in_process_pair_is_crossed() {
	let (host, embedded) = in_process_pair(4096);

	let TransportParts {
		sender: mut host_sender,
		receiver: host_receiver,
		message_rx: _host_rx,
	} = host;
	let TransportParts {
		sender: _embedded_sender,
		receiver: embedded_receiver,
		message_rx: mut embedded_rx,
	} = embedded;

	let _host_reader = tokio::spawn(host_receiver.run());
	let _embedded_reader = tokio::spawn(embedded_receiver.run());

	let message = serde_json::json!({"id": 0, "method": "onForeground"});
	host_sender.send(message.clone()).await.unwrap();

	assert_eq!(embedded_rx.recv().await.unwrap(), message);
}
