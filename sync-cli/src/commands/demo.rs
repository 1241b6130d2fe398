//! Two clients editing one document over an in-process hub.

use anyhow::{bail, Context, Result};
use docsync_client::{DocumentStore, HubTransport, LocalHub, MemoryStore, SyncClient};
use docsync_types::Operation;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use crate::config::Config;

/// How long to wait for the second client to catch up.
const CONVERGE_TIMEOUT: Duration = Duration::from_secs(5);

type DemoClient = SyncClient<HubTransport, MemoryStore>;

fn connect(hub: &LocalHub, store: &MemoryStore, config: &Config, name: &str) -> Arc<DemoClient> {
    let transport = hub.connect();
    let sync_config = config
        .sync_config()
        .with_client_name(name)
        .with_client_id(transport.client_id());
    Arc::new(SyncClient::new(sync_config, transport, store.clone()))
}

/// Run the demo command.
///
/// Returns both clients' text once they agree.
pub async fn run(config: &Config, text: &str) -> Result<(String, String)> {
    let hub = LocalHub::new();
    let store = MemoryStore::new();
    let document = store.create_document("demo").await?;

    let alice = connect(&hub, &store, config, "alice");
    let bob = connect(&hub, &store, config, "bob");
    alice.open_document(document.id.clone()).await?;
    bob.open_document(document.id.clone()).await?;

    let mut events = bob.subscribe();
    let bob_loop = tokio::spawn({
        let bob = Arc::clone(&bob);
        async move { bob.run().await }
    });

    // One batch per keystroke
    for (offset, ch) in text.chars().enumerate() {
        alice
            .apply_local(vec![Operation::insert_text(vec![0, 0], offset, ch)])
            .await
            .context("alice failed to type")?;
    }

    let converged = tokio::time::timeout(CONVERGE_TIMEOUT, async {
        loop {
            if bob.content().await == alice.content().await {
                return true;
            }
            match events.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return false,
            }
        }
    })
    .await
    .unwrap_or(false);

    let alice_text = alice.plain_text().await.unwrap_or_default();
    let bob_text = bob.plain_text().await.unwrap_or_default();
    println!("document: {}", document.id);
    println!("alice:    {}", alice_text);
    println!("bob:      {}", bob_text);

    alice.shutdown().await;
    bob.shutdown().await;
    bob_loop.await??;

    if !converged {
        bail!("clients did not converge on document {}", document.id);
    }
    println!("converged: yes");
    Ok((alice_text, bob_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_converges() {
        let (alice, bob) = run(&Config::default(), "hello world").await.unwrap();
        assert_eq!(alice, "hello world");
        assert_eq!(bob, "hello world");
    }

    #[tokio::test]
    async fn demo_with_unicode_text() {
        let (alice, bob) = run(&Config::default(), "héllo ✓").await.unwrap();
        assert_eq!(alice, "héllo ✓");
        assert_eq!(alice, bob);
    }

    #[tokio::test]
    async fn demo_with_empty_text() {
        let (alice, bob) = run(&Config::default(), "").await.unwrap();
        assert!(alice.is_empty());
        assert!(bob.is_empty());
    }
}
