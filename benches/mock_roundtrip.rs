use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mocksrv::common::{request_timeout, start_fixture_server};
use mocksrv::fixtures::ALL_TYPES_PATH;
use mocksrv::{MockServer, Request, ResponseTemplate, ServerConfig, send_request};

fn bench_closed_loop(c: &mut Criterion) {
    let mut server = start_fixture_server().unwrap();
    let addr = server.local_addr().unwrap();

    let mut group = c.benchmark_group("closed_loop");
    for content_type in ["application/json", "application/xml"] {
        group.bench_with_input(
            BenchmarkId::new("post", content_type),
            &content_type,
            |b, &content_type| {
                let request = Request::post(ALL_TYPES_PATH)
                    .content_type(content_type)
                    .body(br#"{"StringMember":"foo"}"#);
                b.iter(|| {
                    let response = send_request(addr, black_box(&request), request_timeout()).unwrap();
                    assert_eq!(response.status, 200);
                    response
                });
            },
        );
    }
    group.finish();

    server.stop().unwrap();
}

fn bench_body_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("body_size");

    for size in [64, 1024, 16384, 262144] {
        let template = ResponseTemplate::builder(200)
            .body_with_type("application/octet-stream", vec![b'x'; size])
            .build()
            .unwrap();
        let mut server = MockServer::new(template, ServerConfig::default());
        let addr = server.start().unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("get", size), &size, |b, &size| {
            b.iter(|| {
                let response = send_request(addr, &Request::get("/"), request_timeout()).unwrap();
                assert_eq!(response.body.len(), size);
                response
            });
        });

        server.stop().unwrap();
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let template = mocksrv::fixtures::json_xml_template().unwrap();

    c.bench_function("render_json", |b| {
        b.iter(|| template.render(black_box(Some("application/json"))))
    });
    c.bench_function("render_xml", |b| {
        b.iter(|| template.render(black_box(Some("application/xml"))))
    });
}

fn bench_start_stop(c: &mut Criterion) {
    c.bench_function("start_stop", |b| {
        b.iter(|| {
            let mut server = start_fixture_server().unwrap();
            server.stop().unwrap();
        })
    });
}

criterion_group!(benches, bench_closed_loop, bench_body_sizes, bench_render, bench_start_stop);
criterion_main!(benches);
