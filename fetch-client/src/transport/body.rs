//! Request and response bodies.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use pin_project_lite::pin_project;

use crate::ClientError;

pin_project! {
    #[project = KindProj]
    enum Kind {
        // `None` once the single chunk has been yielded, or for an empty body.
        Buffered { chunk: Option<Bytes> },
        Streaming { #[pin] incoming: Incoming },
    }
}

pin_project! {
    /// Bytes sent to, or received from, the network.
    ///
    /// Outgoing bodies and bodies produced by response interceptors are held
    /// in memory. Bodies returned by [`HyperTransport`](super::HyperTransport)
    /// stream from the connection until read.
    pub struct Body {
        #[pin]
        kind: Kind,
    }
}

impl Body {
    pub fn empty() -> Self {
        Self::buffered(None)
    }

    /// A body holding `data` in memory.
    pub fn full(data: impl Into<Bytes>) -> Self {
        Self::buffered(Some(data.into()))
    }

    fn buffered(chunk: Option<Bytes>) -> Self {
        Body {
            kind: Kind::Buffered {
                chunk: chunk.filter(|c| !c.is_empty()),
            },
        }
    }

    pub(crate) fn incoming(incoming: Incoming) -> Self {
        Body {
            kind: Kind::Streaming { incoming },
        }
    }

    /// Drain the body.
    pub async fn bytes(self) -> Result<Bytes, ClientError> {
        if let Kind::Buffered { chunk } = self.kind {
            return Ok(chunk.unwrap_or_default());
        }
        let collected = self.collect().await?;
        Ok(collected.to_bytes())
    }

    /// Drain the body as UTF-8, substituting U+FFFD for invalid sequences.
    pub async fn text(self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl http_body::Body for Body {
    type Data = Bytes;
    type Error = ClientError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, ClientError>>> {
        match self.project().kind.project() {
            KindProj::Buffered { chunk } => Poll::Ready(chunk.take().map(Frame::data).map(Ok)),
            KindProj::Streaming { incoming } => incoming.poll_frame(cx).map(|frame| {
                frame.map(|result| {
                    result.map_err(|e| ClientError::Transport(format!("reading body: {}", e)))
                })
            }),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Buffered { chunk } => chunk.is_none(),
            Kind::Streaming { incoming } => incoming.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Buffered { chunk } => {
                SizeHint::with_exact(chunk.as_ref().map_or(0, |c| c.len() as u64))
            }
            Kind::Streaming { incoming } => incoming.size_hint(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(data: Bytes) -> Self {
        Self::full(data)
    }
}

impl From<String> for Body {
    fn from(data: String) -> Self {
        Self::full(data)
    }
}

impl From<&'static str> for Body {
    fn from(data: &'static str) -> Self {
        Self::full(data)
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Self::full(data)
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::Buffered { chunk } => {
                write!(f, "Body(buffered, {} bytes)", chunk.as_ref().map_or(0, Bytes::len))
            }
            Kind::Streaming { .. } => f.write_str("Body(streaming)"),
        }
    }
}
