use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;

use xsdgate::{Document, GatewayConfig, SchemaModel, ValidationGateway};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn bench_compile(c: &mut Criterion) {
    let path = fixture("purchase.xsd");
    c.bench_function("compile_purchase_schema", |b| {
        b.iter(|| SchemaModel::from_file(black_box(&path)).expect("schema compiles"))
    });
}

fn bench_validate(c: &mut Criterion) {
    let schema = SchemaModel::from_file(fixture("purchase.xsd")).expect("schema compiles");
    let valid = std::fs::read(fixture("purchase_valid.xml")).expect("fixture exists");
    let invalid = std::fs::read(fixture("purchase_invalid.xml")).expect("fixture exists");

    c.bench_function("parse_and_validate_valid", |b| {
        b.iter(|| {
            let document = Document::parse(black_box(&valid)).expect("well-formed");
            schema.validate(&document)
        })
    });
    c.bench_function("parse_and_validate_invalid", |b| {
        b.iter(|| {
            let document = Document::parse(black_box(&invalid)).expect("well-formed");
            schema.validate(&document)
        })
    });

    let items: String = (0..500)
        .map(|i| {
            format!(
                "<item partNum=\"{:03}-AB\"><productName>p{}</productName><quantity>1</quantity><price>9.99</price></item>",
                i, i
            )
        })
        .collect();
    let large = format!(
        r#"<purchaseOrder xmlns="urn:example:purchase" orderDate="2024-01-01">
             <shipTo><name>A</name><street>B</street><city>C</city></shipTo>
             <items>{}</items>
           </purchaseOrder>"#,
        items
    );
    c.bench_function("parse_and_validate_500_items", |b| {
        b.iter(|| {
            let document = Document::parse(black_box(large.as_bytes())).expect("well-formed");
            schema.validate(&document)
        })
    });
}

fn bench_gateway(c: &mut Criterion) {
    let gateway = ValidationGateway::new(GatewayConfig::new(fixture("purchase.xsd"))).expect("gateway starts");
    let valid = std::fs::read(fixture("purchase_valid.xml")).expect("fixture exists");
    c.bench_function("gateway_inspect", |b| b.iter(|| gateway.inspect(black_box(&valid))));
}

criterion_group!(benches, bench_compile, bench_validate, bench_gateway);
criterion_main!(benches);
