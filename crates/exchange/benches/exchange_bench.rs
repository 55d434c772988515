use std::hint::black_box;

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, Criterion};
use futures::executor::block_on;
use futures::{stream, StreamExt};
use micro_exchange::config::ExchangeConfig;
use micro_exchange::protocol::{to_bytes, Content, Headers, ResponseState};

fn bench_pool(c: &mut Criterion) {
    let config = ExchangeConfig::default();
    let responses = config.response_pool();

    c.bench_function("pool_acquire_release", |b| {
        b.iter(|| {
            let mut response = responses.acquire().unwrap();
            response.set_status(200).set_header("Content-Type", "text/plain");
            responses.release(black_box(response)).unwrap();
        });
    });

    let requests = config.request_pool();
    c.bench_function("pool_request_open_close", |b| {
        b.iter(|| {
            let mut request = requests.acquire().unwrap();
            request.open().unwrap();
            request.close().unwrap();
            requests.release(request).unwrap();
        });
    });
}

fn bench_headers(c: &mut Criterion) {
    c.bench_function("headers_build_and_convert", |b| {
        b.iter(|| {
            let mut headers = Headers::with_capacity(4);
            headers.set("Content-Type", "text/html");
            headers.add("Set-Cookie", "a=1");
            headers.add("Set-Cookie", "b=2");
            headers.set("Cache-Control", "no-cache");
            black_box(headers.to_header_map().unwrap());
        });
    });

    c.bench_function("to_bytes_text", |b| {
        b.iter(|| black_box(to_bytes(Some(Content::from("Hello World!\r\n"))).unwrap()));
    });
}

fn bench_tokens(c: &mut Criterion) {
    c.bench_function("tokens_value_bodies", |b| {
        b.iter(|| {
            let mut response = ResponseState::new();
            response.set_content("<html>").unwrap().set_content("Hello World!").unwrap().set_content("</html>").unwrap();
            black_box(response.tokens().count());
        });
    });

    c.bench_function("tokens_iterator_body", |b| {
        let chunks: Vec<Bytes> = (0..64).map(|i| Bytes::from(format!("row-{i}\n"))).collect();
        b.iter(|| {
            let mut response = ResponseState::new();
            response.add_iter(chunks.clone(), "text/csv").unwrap();
            black_box(response.tokens().count());
        });
    });

    c.bench_function("tokens_async_body", |b| {
        let chunks: Vec<Bytes> = (0..64).map(|i| Bytes::from(format!("data: {i}\n\n"))).collect();
        b.iter(|| {
            let mut response = ResponseState::new();
            response.add_stream(stream::iter(chunks.clone()), "text/event-stream").unwrap();
            black_box(block_on(response.tokens().into_stream().count()));
        });
    });
}

criterion_group!(benches, bench_pool, bench_headers, bench_tokens);
criterion_main!(benches);
