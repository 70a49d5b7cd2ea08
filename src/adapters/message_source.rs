use crate::domain::ports::{InboundMessage, MessageSource};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};
use tokio::sync::mpsc;

/// 以 tokio channel 接收訊息，供嵌入 broker client 或測試使用
pub struct ChannelSource {
    receiver: mpsc::Receiver<InboundMessage>,
}

impl ChannelSource {
    pub fn new(receiver: mpsc::Receiver<InboundMessage>) -> Self {
        Self { receiver }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<InboundMessage>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver))
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn next_message(&mut self) -> Option<InboundMessage> {
        self.receiver.recv().await
    }
}

/// 每行一筆 JSON 訊息 (stdin 或檔案)
///
/// 以原始位元組切行，非 UTF-8 的行照樣交給 consumer 判定為 malformed。
pub struct JsonLinesSource<R> {
    segments: Split<R>,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            segments: reader.split(b'\n'),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> MessageSource for JsonLinesSource<R> {
    async fn next_message(&mut self) -> Option<InboundMessage> {
        loop {
            match self.segments.next_segment().await {
                Ok(Some(mut line)) => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    return Some(InboundMessage::new(line));
                }
                Ok(None) => return None,
                Err(e) => {
                    tracing::error!("Failed to read from message stream: {}", e);
                    return None;
                }
            }
        }
    }
}
