//! 계약 목록 추출 성능 벤치마크
//!
//! 100개 레코드 쌍(200행)이 있는 페이지에서 추출 비용을 측정한다.
//! - 경계 없음: 모든 행을 끝까지 스캔 (Continue)
//! - 중간 경계: 50번째 레코드에서 날짜가 바뀜 (DateBoundary, 이후 행은 계수만)

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use s2b_harvest_lib::domain::TargetDate;
use s2b_harvest_lib::infrastructure::parsing::{ContractTableParser, ParseContext};

fn synthetic_page(pairs: u32, boundary_at: Option<u32>) -> String {
    let mut body = String::new();
    for no in 1..=pairs {
        let day = match boundary_at {
            Some(b) if no >= b => "20250602",
            _ => "20250601",
        };
        body.push_str(&format!(
            "<tr><td>{no}</td><td>물품</td><td>{day}-{no:05}</td><td>사무용품 구매 {no}</td><td>1,234,000</td><td>(주)업체{no}</td></tr>\
             <tr><td></td><td>서울학교{no}</td><td></td><td>2025-06-01</td></tr>"
        ));
    }
    format!(
        "<html><body><table><tr><td>menu</td></tr><tr><td>search</td></tr><tr><td>\
         <table><tr><th>No</th><th>계약구분</th><th>계약번호</th><th>계약명</th><th>금액</th><th>계약대상자</th></tr>\
         <tr><th></th><th>기관명</th><th></th><th>계약일</th></tr>{body}</table>\
         </td></tr></table></body></html>"
    )
}

fn extract_comparison(c: &mut Criterion) {
    let parser = ContractTableParser::new().unwrap();
    let date: TargetDate = "20250601".parse().unwrap();
    let context = ParseContext::new(date, 1);

    let full_page = synthetic_page(100, None);
    let boundary_page = synthetic_page(100, Some(50));

    c.bench_function("추출 - 100쌍, 경계 없음", |b| {
        b.iter(|| parser.extract(black_box(&full_page), &context));
    });

    c.bench_function("추출 - 100쌍, 50번째에서 경계", |b| {
        b.iter(|| parser.extract(black_box(&boundary_page), &context));
    });
}

criterion_group!(benches, extract_comparison);
criterion_main!(benches);
