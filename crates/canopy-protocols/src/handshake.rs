//! Identity exchange at the start of every connection.

use crate::error::{Error, Result};
use crate::frame::{read_message, write_message};
use canopy_topology::Node;
use tokio::io::{AsyncRead, AsyncWrite};

/// Message body that refuses a connection.
pub const CLOSE_CONNECTION_MARK: &[u8] = b"***###***";

pub fn is_close_mark(body: &[u8]) -> bool {
    body == CLOSE_CONNECTION_MARK
}

/// Send `local`, then read and return the peer's identity.
///
/// Both ends call this; neither waits for the other before writing.
pub async fn exchange_identity<S>(stream: &mut S, local: &Node) -> Result<Node>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    write_message(stream, &serde_json::to_vec(local)?).await?;
    let body = read_message(stream).await?;
    if is_close_mark(&body) {
        return Err(Error::HandshakeRejected);
    }
    let peer: Node = serde_json::from_slice(&body)?;
    tracing::trace!(local = %local.name, peer = %peer.name, "identity exchanged");
    Ok(peer)
}

/// Check the peer is the node this edge expects.
pub fn expect_identity(peer: &Node, expected: &str) -> Result<()> {
    if peer.name != expected {
        return Err(Error::UnexpectedPeer {
            expected: expected.to_string(),
            actual: peer.name.clone(),
        });
    }
    Ok(())
}

/// Refuse the connection.
pub async fn reject<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_message(writer, CLOSE_CONNECTION_MARK).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn both_sides_learn_each_other() {
        let (mut left, mut right) = duplex(4096);
        let a = Node { value: 3, ..Node::new("a").with_children(["c"]) };
        let c = Node { value: 7, ..Node::new("c") };

        let (seen_by_a, seen_by_c) = tokio::join!(
            exchange_identity(&mut left, &a),
            exchange_identity(&mut right, &c),
        );
        assert_eq!(seen_by_a.unwrap(), c);
        assert_eq!(seen_by_c.unwrap(), a);
    }

    #[tokio::test]
    async fn close_mark_rejects() {
        let (mut left, mut right) = duplex(4096);
        let a = Node::new("a");

        let (outcome, _) = tokio::join!(exchange_identity(&mut left, &a), async {
            let _ = read_message(&mut right).await;
            reject(&mut right).await
        });
        assert!(matches!(outcome, Err(Error::HandshakeRejected)));
    }

    #[tokio::test]
    async fn peer_hanging_up_is_an_io_error() {
        let (mut left, right) = duplex(4096);
        drop(right);
        let outcome = exchange_identity(&mut left, &Node::new("a")).await;
        assert!(matches!(outcome, Err(Error::Io(_))));
    }

    #[test]
    fn identity_check() {
        let peer = Node::new("b");
        assert!(expect_identity(&peer, "b").is_ok());
        assert!(matches!(
            expect_identity(&peer, "a"),
            Err(Error::UnexpectedPeer { expected, actual }) if expected == "a" && actual == "b"
        ));
    }

    #[test]
    fn close_mark() {
        assert!(is_close_mark(b"***###***"));
        assert!(!is_close_mark(b"***###"));
    }
}
