use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use http::{Method, Request};
use micro_exchange::codec::{Control, Token};
use micro_exchange::config::ExchangeConfig;
use micro_exchange::pool::Pool;
use micro_exchange::protocol::{RequestState, ResponseState};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match ExchangeConfig::builder().max_outstanding(2).max_idle(4).build() {
        Ok(config) => config,
        Err(e) => {
            error!(cause = %e, "invalid exchange config");
            return;
        }
    };

    let requests = Arc::new(config.request_pool());
    let responses = Arc::new(config.response_pool());

    let mut tasks = Vec::new();
    for id in 0..4 {
        let requests = Arc::clone(&requests);
        let responses = Arc::clone(&responses);
        tasks.push(tokio::spawn(async move {
            if let Err(e) = exchange(id, &requests, &responses).await {
                error!(id, cause = %e, "exchange failed");
            }
        }));
    }

    for task in tasks {
        if let Err(e) = task.await {
            error!(cause = %e, "exchange task panicked or was cancelled");
        }
    }

    info!(requests = ?requests.stats(), responses = ?responses.stats(), "all exchanges finished");
}

async fn exchange(id: usize, requests: &Pool<RequestState>, responses: &Pool<ResponseState>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut request = requests.acquire_wait().await?;
    let (parts, ()) = Request::builder().method(Method::GET).uri(format!("/events/{id}")).body(())?.into_parts();
    request.load_head(parts);
    request.add_param("id", id.to_string());
    request.on_close(|request| info!(uri = %request.uri(), "close callback fired"));
    request.open()?;

    let mut response = responses.acquire_wait().await?;
    response.set_status(200).set_header("Cache-Control", "no-cache");
    response.set_content("retry: 1000\n\n")?;

    let (sender, receiver) = futures::channel::mpsc::channel::<Bytes>(1);
    tokio::spawn(emit_events(sender));
    response.add_stream(receiver, "text/event-stream")?;

    let head = response.head()?;
    info!(id, status = %head.status(), headers = ?head.headers(), "response head ready");

    let mut tokens = response.tokens().into_stream();
    let mut in_chunk = false;
    while let Some(token) = tokens.next().await {
        match token? {
            Token::Control(Control::Chunk) => in_chunk = true,
            Token::Data(bytes) if in_chunk => {
                in_chunk = false;
                info!(id, chunk = ?bytes, "write chunk");
            }
            Token::Data(tag) => info!(id, kind = ?tag, "start body"),
            Token::Control(Control::End) => info!(id, "end of response"),
            Token::Control(Control::Type) => {}
        }
    }
    drop(tokens);

    request.close()?;
    requests.release(request)?;
    responses.release(response)?;
    Ok(())
}

async fn emit_events(mut sender: futures::channel::mpsc::Sender<Bytes>) {
    use futures::SinkExt;

    for i in 0..3 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if sender.send(Bytes::from(format!("data: {i}\n\n"))).await.is_err() {
            return;
        }
    }
}
