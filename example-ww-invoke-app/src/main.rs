use example_ww_invoke_app::{host_process, service_table};
use example_ww_invoke_service_definition::{Greet, Sum};
use std::sync::Arc;
use tokio::join;
use tracing_subscriber::EnvFilter;
use ww_invoke::address::{PeerId, ProcessId};
use ww_invoke::call::MethodCall;
use ww_invoke_capability::{CapabilityCall, CapabilityClient, CapabilityServer};
use ww_invoke_transport::{CancellationToken, Invoker, MemoryOverlay};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let table = Arc::new(service_table().await?);

    {
        // One stream per call through the overlay.
        let overlay = MemoryOverlay::new();
        let peer: PeerId = "A".parse()?;
        let pid: ProcessId = "42".parse()?;
        let address = host_process(&overlay, &peer, &pid, table.clone())?;

        let invoker = Invoker::new(overlay);
        let call = MethodCall::with_words("echo", vec![7, 9], b"hi".to_vec())?;
        let reply = invoker
            .invoke(&peer, &pid, &call, &CancellationToken::new())
            .await?;

        println!("Round trip to {}: {:?}", address, reply);
    }

    {
        // A long-lived connection to the same service as a bootstrap capability.
        let (server_end, client_end) = tokio::io::duplex(64 * 1024);
        let server = Arc::new(CapabilityServer::new(table));
        server.accept(server_end)?;

        let cancel = CancellationToken::new();
        let serving = tokio::spawn({
            let server = server.clone();
            let cancel = cancel.clone();
            async move { server.serve(cancel).await }
        });

        let client = CapabilityClient::connect(client_end);
        let bootstrap = client.bootstrap();

        // `join!` will await all responses before proceeding
        let (res1, res2, res3) = join!(
            Sum::call(&bootstrap, vec![1, 2, 3]),
            Sum::call(&bootstrap, vec![8, 3, 7]),
            Greet::call(&bootstrap, "world".to_string())
        );

        println!("Result from first sum(): {:?}", res1);
        println!("Result from second sum(): {:?}", res2);
        println!("Result from greet(): {:?}", res3);

        cancel.cancel();
        serving.await??;
        println!("Server state after cancel: {:?}", server.state());
    }

    Ok(())
}
