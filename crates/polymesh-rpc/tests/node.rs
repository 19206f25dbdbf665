//! Live node integration tests for the RPC client.
//!
//! Run with: cargo test -p polymesh-rpc --test node -- --ignored
//!
//! Requires a node at POLYMESH_NODE_URL (default: http://localhost:9933) and,
//! for the indexer test, POLYMESH_MIDDLEWARE_URL.

use polymesh_rpc::{Middleware, MiddlewareRpc, NodeRpc};

fn node() -> NodeRpc {
    let url = std::env::var("POLYMESH_NODE_URL").unwrap_or_else(|_| "http://localhost:9933".to_string());
    NodeRpc::new(&url)
}

#[tokio::test]
#[ignore]
async fn test_finalized_head_and_header() {
    let n = node();
    let head = n.finalized_head().await.expect("finalized head failed");
    let header = n.header(Some(&head)).await.expect("header failed");
    assert!(header.number > 0, "finalized height should be positive");

    let parent = n.header(Some(&header.parent_hash)).await.expect("parent header failed");
    assert_eq!(parent.number + 1, header.number);
}

#[tokio::test]
#[ignore]
async fn test_block_has_timestamp_extrinsic() {
    let n = node();
    let head = n.finalized_head().await.expect("finalized head failed");
    let block = n.block(&head).await.expect("block failed");
    assert_eq!(block.hash, head);
    assert!(!block.extrinsic_hashes.is_empty(), "every block carries the timestamp inherent");
}

#[tokio::test]
#[ignore]
async fn test_genesis_and_runtime() {
    let n = node();
    let genesis = n.genesis_hash().await.expect("genesis failed");
    assert_eq!(n.block_hash(0).await.unwrap(), Some(genesis));

    let version = n.runtime_version().await.expect("runtime version failed");
    assert!(version.spec_version > 0);
    println!("{} v{}", version.spec_name, version.spec_version);
}

#[tokio::test]
#[ignore]
async fn test_middleware_latest_block() {
    let Ok(url) = std::env::var("POLYMESH_MIDDLEWARE_URL") else {
        return;
    };
    let middleware = MiddlewareRpc::new(&url);
    let latest = middleware.latest_block().await.expect("latest block failed");
    assert!(latest > 0);
}
