//! Offline fetch tests against a local TCP stub standing in for the API.

use census_trade::{Client, Dataset, Endpoint, Period, QuerySpec, TradeFlow};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

/// Serve one canned HTTP response per expected request, in order.
fn serve(responses: Vec<String>) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        for body in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                head.extend_from_slice(&buf[..n]);
                if n == 0 || head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let resp = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(resp.as_bytes()).unwrap();
        }
    });
    (format!("http://{}", addr), handle)
}

fn spec_for_years(start: i32, end: i32) -> QuerySpec {
    QuerySpec::new(
        Dataset::new(TradeFlow::Imports, Endpoint::Hs),
        Period::new(start, end).unwrap(),
    )
}

#[test]
fn unparseable_response_is_skipped_and_partial_results_survive() {
    // The API reports some errors in 200-status non-array bodies; one bad
    // call must not discard the rows from the good ones.
    let bad = r#"{"error":"there was an error while running your query"}"#.to_string();
    let good = r#"[["I_COMMODITY","GEN_VAL_YR","time"],["8517620000","100","2020-12"]]"#.to_string();
    let (base_url, handle) = serve(vec![bad, good]);

    let mut client = Client::default();
    client.base_url = base_url;
    let table = client
        .fetch(&spec_for_years(2019, 2020))
        .unwrap()
        .expect("the good call's rows");
    handle.join().unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.rows[0][0], "8517620000");
}

#[test]
fn run_with_only_failed_calls_reports_no_data() {
    let bad = r#"{"error":"unknown variable"}"#.to_string();
    let (base_url, handle) = serve(vec![bad]);

    let mut client = Client::default();
    client.base_url = base_url;
    let result = client.fetch(&spec_for_years(2020, 2020)).unwrap();
    handle.join().unwrap();

    assert!(result.is_none());
}

#[test]
fn good_responses_across_years_merge() {
    let a = r#"[["I_COMMODITY","GEN_VAL_YR","time"],["8517620000","100","2019-12"]]"#.to_string();
    let b = r#"[["I_COMMODITY","GEN_VAL_YR","time"],["8517620000","250","2020-12"]]"#.to_string();
    let (base_url, handle) = serve(vec![a, b]);

    let mut client = Client::default();
    client.base_url = base_url;
    let table = client.fetch(&spec_for_years(2019, 2020)).unwrap().unwrap();
    handle.join().unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[1][1], "250");
}
