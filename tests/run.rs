use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use arkereso::aggregator::{Aggregator, CsvSink, MemorySink, RunOutcome};
use arkereso::classifier::mock::MockJudge;
use arkereso::classifier::{Classifier, ClassifierConfig, JudgementFuture, JudgementService};
use arkereso::driver::RunDriver;
use arkereso::producer::{
    ExtractionProducer, HttpProducer, ProduceFuture, ProducerConfig, StoreProfile,
};
use arkereso::record::{MatchRecord, Status};
use mockito::{Matcher, Server};

/// Producer returning canned names after an optional delay
struct Canned {
    store: &'static str,
    names: Vec<&'static str>,
    delay: Duration,
}

impl Canned {
    fn new(store: &'static str, names: Vec<&'static str>) -> Self {
        Self {
            store,
            names,
            delay: Duration::ZERO,
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ExtractionProducer for Canned {
    fn store(&self) -> &str {
        self.store
    }

    fn produce<'a>(&'a self, search_term: &'a str) -> ProduceFuture<'a> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(self
                .names
                .iter()
                .map(|name| {
                    MatchRecord::new(
                        self.store,
                        search_term,
                        Some(format!("{} {}", name, search_term)),
                        Some("3490".to_string()),
                        Some(format!("https://{}.example/{}", self.store, name)),
                    )
                })
                .collect())
        })
    }
}

fn accepting_classifier() -> Arc<Classifier> {
    let judge =
        MockJudge::replying(r#"{"relevant": "YES", "score": 92, "rationale": "same tool"}"#);
    let config = ClassifierConfig::builder().backoff(Duration::ZERO).build();
    Arc::new(Classifier::new(Arc::new(judge), config))
}

#[tokio::test]
async fn test_hammer_run_writes_one_sorted_report() {
    let dir = tempfile::tempdir().unwrap();
    let producers: Vec<Arc<dyn ExtractionProducer>> = vec![
        Arc::new(Canned::new("Praktiker", vec![])),
        Arc::new(Canned::new("Bauhaus", vec!["Claw"])),
        Arc::new(Canned::new("OBI", vec![])),
    ];
    let aggregator = Arc::new(Aggregator::new(CsvSink::new(dir.path())));

    let outcome = RunDriver::new(producers, accepting_classifier(), Arc::clone(&aggregator))
        .run(&["hammer".to_string()])
        .await
        .unwrap();

    let (path, rows) = match outcome {
        RunOutcome::Written { path, rows } => (path, rows),
        other => panic!("expected a written report, got {:?}", other),
    };
    assert_eq!(rows, 3);
    assert!(aggregator.is_finished());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    let summary: Vec<(&str, &str, &str)> = records
        .iter()
        .map(|r| (&r[0], &r[2], &r[8]))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Bauhaus", "Claw hammer", "ACCEPTED"),
            ("OBI", "NO_RESULT", "NO_RESULT"),
            ("Praktiker", "NO_RESULT", "NO_RESULT"),
        ]
    );
    assert_eq!(&records[0][5], "RELEVANT");
    assert_eq!(&records[0][6], "92");
    assert_eq!(&records[1][3], "-");
    assert_eq!(&records[1][4], "-");
}

#[tokio::test]
async fn test_staggered_producers_cover_every_pair_once() {
    let sink = MemorySink::new();
    let producers: Vec<Arc<dyn ExtractionProducer>> = vec![
        Arc::new(Canned::new("Bauhaus", vec!["a", "b"]).delayed(Duration::from_millis(30))),
        Arc::new(Canned::new("OBI", vec![]).delayed(Duration::from_millis(5))),
        Arc::new(Canned::new("Praktiker", vec!["c"])),
    ];
    let terms: Vec<String> = ["hammer", "saw", "E27 bulb", "drill"]
        .iter()
        .map(|t| t.to_string())
        .collect();

    let outcome = RunDriver::new(
        producers,
        accepting_classifier(),
        Arc::new(Aggregator::new(sink.clone())),
    )
    .classify_concurrency(3)
    .run(&terms)
    .await
    .unwrap();

    assert!(matches!(outcome, RunOutcome::Written { rows: 16, .. }));
    let batches = sink.batches();
    assert_eq!(batches.len(), 1);

    let rows = &batches[0];
    let pairs: HashSet<(&str, &str)> = rows
        .iter()
        .map(|r| (r.store.as_str(), r.search_term.as_str()))
        .collect();
    assert_eq!(pairs.len(), 12);

    let placeholders = rows.iter().filter(|r| r.status == Status::NoResult).count();
    assert_eq!(placeholders, 4);
    assert!(
        rows.iter()
            .filter(|r| r.store == "OBI")
            .all(|r| r.status == Status::NoResult)
    );

    let mut sorted = rows.clone();
    sorted.sort_by(|a, b| (&a.store, &a.search_term).cmp(&(&b.store, &b.search_term)));
    assert_eq!(&sorted, rows);
}

#[tokio::test]
async fn test_ai_disabled_run() {
    let sink = MemorySink::new();
    let judge = MockJudge::replying("YES");
    let classifier = Arc::new(Classifier::new(
        Arc::new(judge.clone()),
        ClassifierConfig::default(),
    ));
    let producers: Vec<Arc<dyn ExtractionProducer>> =
        vec![Arc::new(Canned::new("OBI", vec!["Claw", "Sledge"]))];

    RunDriver::new(producers, classifier, Arc::new(Aggregator::new(sink.clone())))
        .ai_enabled(false)
        .run(&["hammer".to_string()])
        .await
        .unwrap();

    assert_eq!(judge.calls(), 0);
    let rows = &sink.batches()[0];
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.status == Status::AiDisabled));
}

#[tokio::test]
async fn test_http_stores_end_to_end() {
    let mut bauhaus = Server::new_async().await;
    let mut obi = Server::new_async().await;
    let mut praktiker = Server::new_async().await;

    let bauhaus_page = bauhaus
        .mock("GET", "/catalogsearch/result/")
        .match_query(Matcher::UrlEncoded("q".into(), "hammer".into()))
        .with_status(200)
        .with_body(
            r#"
            <div class="prefixbox-product-container">
              <a class="prefixbox-product-name" href="/p/claw-hammer">
                <span>Claw Hammer 500g</span>
              </a>
              <div class="prefixbox-product-price">4 990 Ft</div>
            </div>
            "#,
        )
        .create_async()
        .await;
    let obi_page = obi
        .mock("GET", "/search/hammer")
        .with_status(200)
        .with_body("<ul class=\"products-wp\"></ul>")
        .create_async()
        .await;
    let praktiker_page = praktiker
        .mock("GET", "/search/hammer")
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let config = ProducerConfig::builder()
        .retries(1)
        .retry_delay(Duration::ZERO)
        .build();
    let producers: Vec<Arc<dyn ExtractionProducer>> = [
        StoreProfile::bauhaus().with_base_url(bauhaus.url()),
        StoreProfile::obi().with_base_url(obi.url()),
        StoreProfile::praktiker().with_base_url(praktiker.url()),
    ]
    .into_iter()
    .map(|profile| {
        Arc::new(HttpProducer::new(profile, config.clone()).unwrap()) as Arc<dyn ExtractionProducer>
    })
    .collect();

    let sink = MemorySink::new();
    RunDriver::new(
        producers,
        accepting_classifier(),
        Arc::new(Aggregator::new(sink.clone())),
    )
    .run(&["hammer".to_string()])
    .await
    .unwrap();

    bauhaus_page.assert_async().await;
    obi_page.assert_async().await;
    praktiker_page.assert_async().await;

    let rows = &sink.batches()[0];
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].store, "Bauhaus");
    assert_eq!(rows[0].name, "Claw Hammer 500g");
    assert_eq!(rows[0].price, "4990");
    assert_eq!(rows[0].url, format!("{}/p/claw-hammer", bauhaus.url()));
    assert_eq!(rows[0].status, Status::Accepted);
    assert_eq!(rows[1].status, Status::NoResult);
    assert_eq!(rows[2].status, Status::NoResult);
}

/// Model server that answers one prompt at a time and queues the rest
struct SerialJudge {
    busy: tokio::sync::Mutex<()>,
    latency: Duration,
}

impl JudgementService for SerialJudge {
    fn generate<'a>(&'a self, _model: &'a str, _prompt: &'a str) -> JudgementFuture<'a> {
        Box::pin(async move {
            let _busy = self.busy.lock().await;
            tokio::time::sleep(self.latency).await;
            Ok(r#"{"relevant": "YES", "score": 88}"#.to_string())
        })
    }
}

#[tokio::test]
async fn test_busy_model_server_does_not_cause_ai_errors() {
    let judge = SerialJudge {
        busy: tokio::sync::Mutex::new(()),
        latency: Duration::from_millis(20),
    };
    let config = ClassifierConfig::builder()
        .backoff(Duration::ZERO)
        .attempt_timeout(Duration::from_millis(400))
        .build();
    let classifier = Arc::new(Classifier::new(Arc::new(judge), config));

    let producers: Vec<Arc<dyn ExtractionProducer>> = ["Bauhaus", "OBI", "Praktiker"]
        .into_iter()
        .map(|store| Arc::new(Canned::new(store, vec!["a", "b"])) as Arc<dyn ExtractionProducer>)
        .collect();
    let terms: Vec<String> = (1..=10).map(|n| format!("term {}", n)).collect();

    let sink = MemorySink::new();
    RunDriver::new(producers, classifier, Arc::new(Aggregator::new(sink.clone())))
        .run(&terms)
        .await
        .unwrap();

    let rows = &sink.batches()[0];
    assert_eq!(rows.len(), 60);
    let ai_errors = rows.iter().filter(|r| r.status == Status::AiError).count();
    assert_eq!(ai_errors, 0);
    assert!(rows.iter().all(|r| r.status == Status::Accepted));
}
