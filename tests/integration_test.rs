use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use keychunk::prelude::*;
use keychunk::store::MemoryKeys;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

const ALL_RECORDS: i64 = 55;
const NAMED_B: i64 = 23;
const CHUNK_SIZE: usize = 10;

/// Typed record expecting a single `name` field
#[derive(Debug)]
struct Hoge {
    key: Key,
    name: Option<String>,
}

impl Entity for Hoge {
    fn key(&self) -> &Key {
        &self.key
    }

    fn load(&mut self, properties: &PropertyMap) -> Result<(), FieldMismatch> {
        let mut mismatch = None;
        for (field, value) in properties {
            match (field.as_str(), value) {
                ("name", Value::Text(name)) => self.name = Some(name.clone()),
                _ => {
                    mismatch.get_or_insert_with(|| FieldMismatch::new("Hoge", field, "no such field"));
                }
            }
        }
        mismatch.map_or(Ok(()), Err)
    }
}

fn parent_key() -> Key {
    Key::new("Parent", 1)
}

/// 55 `Hoge` records under one parent: 32 named "A", 23 named "B"
///
/// With `stale`, the last record carries an `old_name` property instead.
fn seed(stale: bool) -> MemoryStore {
    let store = MemoryStore::new();
    store.put(parent_key(), PropertyMap::new());

    for id in 1..=ALL_RECORDS {
        let name = if id <= ALL_RECORDS - NAMED_B { "A" } else { "B" };
        let field = if stale && id == ALL_RECORDS { "old_name" } else { "name" };
        store.put(
            Key::new("Hoge", id).with_parent(parent_key()),
            PropertyMap::from([(field.to_string(), Value::from(name))]),
        );
    }
    store
}

fn options() -> Options<Hoge> {
    Options::new(|_, key, _| vec![Hoge { key, name: None }])
        .with_chunk_size(CHUNK_SIZE)
        .with_ancestor(parent_key())
}

fn hoge_query() -> Query {
    Query::new("Hoge").ancestor(parent_key())
}

async fn drain<T>(units: UnitStream<T>) -> (usize, usize, Option<PipelineError>) {
    let mut units = units;
    let (mut chunks, mut records) = (0, 0);
    while let Some(unit) = units.next().await {
        match unit {
            Ok(chunk) => {
                chunks += 1;
                records += chunk.len();
            }
            Err(err) => {
                // Nothing may follow an error unit.
                assert!(units.next().await.is_none());
                return (chunks, records, Some(err));
            }
        }
    }
    (chunks, records, None)
}

#[tokio::test]
async fn fetches_all_records() {
    let units = Pipeline::new(Arc::new(seed(false)), options()).stream(hoge_query());
    let (chunks, records, err) = drain(units).await;

    assert!(err.is_none());
    assert_eq!(records, ALL_RECORDS as usize);
    assert_eq!(chunks, 6);
}

#[tokio::test]
async fn hydrated_records_carry_their_fields() {
    let records = Pipeline::new(Arc::new(seed(false)), options())
        .stream(hoge_query().filter("name", "B"))
        .collect_records()
        .await
        .unwrap();

    assert_eq!(records.len(), NAMED_B as usize);
    assert!(records.iter().all(|r| r.name.as_deref() == Some("B")));
}

#[tokio::test]
async fn filtered_query_with_other_chunk_sizes() {
    for chunk_size in [1, 5, 23, 100] {
        let count = Pipeline::new(Arc::new(seed(false)), options().with_chunk_size(chunk_size))
            .stream(hoge_query().filter("name", "B"))
            .count_records()
            .await
            .unwrap();
        assert_eq!(count, NAMED_B as usize, "chunk size {chunk_size}");
    }
}

#[tokio::test]
async fn shaper_dropping_every_key_yields_nothing() {
    let options = Options::new(|_, _, _| Vec::<Hoge>::new()).with_chunk_size(CHUNK_SIZE);
    let (chunks, records, err) =
        drain(Pipeline::new(Arc::new(seed(false)), options).stream(hoge_query())).await;

    assert!(err.is_none());
    assert_eq!(records, 0);
    assert_eq!(chunks, 6);
}

#[tokio::test]
async fn stale_record_is_skipped_when_tolerant() {
    let units = Pipeline::new(Arc::new(seed(true)), options().tolerate_field_mismatch(true))
        .stream(hoge_query());
    let (_, records, err) = drain(units).await;

    assert!(err.is_none());
    assert_eq!(records, ALL_RECORDS as usize - 1);
}

#[tokio::test]
async fn stale_record_is_fatal_when_strict() {
    let units = Pipeline::new(Arc::new(seed(true)), options()).stream(hoge_query());
    let (_, records, err) = drain(units).await;

    assert!(records < ALL_RECORDS as usize);
    let err = err.expect("strict mode must surface the field mismatch");
    let Some(FetchError::Multi(errors)) = err.fetch_error() else {
        panic!("Expected Multi fetch error, got {err}");
    };
    let failed: Vec<_> = errors.iter().flatten().collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(failed[0], ItemError::FieldMismatch(m) if m.field == "old_name"));
}

#[tokio::test]
async fn empty_result_yields_one_empty_unit() {
    let units = Pipeline::new(Arc::new(seed(false)), options())
        .stream(Query::new("Hoge").ancestor(Key::new("Parent", 2)));
    let (chunks, records, err) = drain(units).await;

    assert!(err.is_none());
    assert_eq!((chunks, records), (1, 0));
}

#[tokio::test]
async fn cancelled_before_start_emits_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let units = generate(Arc::new(seed(false)), hoge_query(), options(), cancel);
    assert_eq!(drain(units).await, (0, 0, None));
}

#[tokio::test]
async fn cancelling_mid_stream_closes_the_stream() {
    let cancel = CancellationToken::new();
    let mut units = generate(
        Arc::new(seed(false)),
        hoge_query(),
        options().with_chunk_size(1),
        cancel.clone(),
    );

    assert!(units.next().await.unwrap().is_ok());
    cancel.cancel();

    let (_, records, err) = drain(units).await;
    assert!(err.is_none());
    assert!(records < ALL_RECORDS as usize);
}

/// What a `FaultyStore` should break
#[derive(Debug, Clone, Copy)]
enum Fault {
    Run,
    NextAfter(usize),
    Cursor,
    Fetch,
    PanicOnFetch,
}

/// MemoryStore wrapper that injects one kind of failure
struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
    fetches: AtomicUsize,
}

impl FaultyStore {
    fn new(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: seed(false),
            fault,
            fetches: AtomicUsize::new(0),
        })
    }
}

struct FaultyKeys {
    inner: MemoryKeys,
    fault: Fault,
    served: usize,
}

#[async_trait]
impl KeyIterator for FaultyKeys {
    async fn next(&mut self) -> Result<Option<Key>, StoreError> {
        if let Fault::NextAfter(limit) = self.fault
            && self.served >= limit
        {
            return Err(StoreError::Unavailable("iterator reset".to_string()));
        }
        self.served += 1;
        self.inner.next().await
    }

    async fn cursor(&self) -> Result<Cursor, StoreError> {
        match self.fault {
            Fault::Cursor => Err(StoreError::Unavailable("no cursor".to_string())),
            _ => self.inner.cursor().await,
        }
    }
}

#[async_trait]
impl Datastore for FaultyStore {
    type Keys = FaultyKeys;

    async fn run(&self, query: &Query) -> Result<Self::Keys, StoreError> {
        if let Fault::Run = self.fault {
            return Err(StoreError::Query("bad query".to_string()));
        }
        Ok(FaultyKeys {
            inner: self.inner.run(query).await?,
            fault: self.fault,
            served: 0,
        })
    }

    async fn get_multi<E: Entity>(&self, entities: &mut [E]) -> Result<(), FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::Fetch => Err(StoreError::Unavailable("backend down".to_string()).into()),
            Fault::PanicOnFetch => panic!("fetch exploded"),
            _ => self.inner.get_multi(entities).await,
        }
    }
}

#[tokio::test]
async fn query_failure_is_the_only_unit() {
    let store = FaultyStore::new(Fault::Run);
    let (chunks, _, err) = drain(Pipeline::new(Arc::clone(&store), options()).stream(hoge_query())).await;

    assert_eq!(chunks, 0);
    assert!(matches!(err, Some(PipelineError::Iteration(StoreError::Query(_)))));
    assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn iterator_failure_mid_scan_ends_stream() {
    let store = FaultyStore::new(Fault::NextAfter(3));
    let (_, _, err) = drain(Pipeline::new(store, options()).stream(hoge_query())).await;
    assert!(matches!(err, Some(PipelineError::Iteration(StoreError::Unavailable(_)))));
}

#[tokio::test]
async fn cursor_failure_ends_stream() {
    let store = FaultyStore::new(Fault::Cursor);
    let (_, records, err) = drain(Pipeline::new(store, options()).stream(hoge_query())).await;

    assert!(matches!(err, Some(PipelineError::Cursor(_))));
    assert_eq!(records, 0);
}

#[tokio::test]
async fn cursor_is_not_needed_for_a_single_short_page() {
    let store = FaultyStore::new(Fault::Cursor);
    let count = Pipeline::new(store, options().with_chunk_size(100))
        .stream(hoge_query())
        .count_records()
        .await
        .unwrap();
    assert_eq!(count, ALL_RECORDS as usize);
}

#[tokio::test]
async fn opaque_fetch_failure_is_fatal_even_when_tolerant() {
    for tolerate in [false, true] {
        let store = FaultyStore::new(Fault::Fetch);
        let units = Pipeline::new(store, options().tolerate_field_mismatch(tolerate)).stream(hoge_query());
        let (_, records, err) = drain(units).await;

        assert_eq!(records, 0);
        let err = err.expect("fetch failure must surface");
        assert!(matches!(err.fetch_error(), Some(FetchError::Opaque(StoreError::Unavailable(_)))));
    }
}

#[tokio::test]
async fn panicking_fetch_becomes_task_failure() {
    let store = FaultyStore::new(Fault::PanicOnFetch);
    let (_, _, err) = drain(Pipeline::new(store, options()).stream(hoge_query())).await;
    assert!(matches!(err, Some(PipelineError::TaskFailed(_))));
}

#[tokio::test]
async fn panicking_shaper_surfaces_as_task_failure() {
    let options = Options::new(|_, key: Key, _: Option<&Key>| {
        assert!(key.int_id() != Some(25), "cannot shape {key}");
        vec![Hoge { key, name: None }]
    })
    .with_chunk_size(CHUNK_SIZE);

    let (_, records, err) = drain(Pipeline::new(Arc::new(seed(false)), options).stream(hoge_query())).await;

    assert!(records <= 2 * CHUNK_SIZE);
    assert!(matches!(err, Some(PipelineError::TaskFailed(_))));
}

#[tokio::test]
async fn oversized_chunk_size_reads_one_page() {
    let options = options().with_chunk_size(usize::MAX / 2);
    let (chunks, records, err) = drain(Pipeline::new(Arc::new(seed(false)), options).stream(hoge_query())).await;

    assert!(err.is_none());
    assert_eq!((chunks, records), (1, ALL_RECORDS as usize));
}

/// Store whose first batch fetch is much slower than the rest
struct SlowFirstFetch {
    inner: MemoryStore,
    fetches: AtomicUsize,
}

#[async_trait]
impl Datastore for SlowFirstFetch {
    type Keys = MemoryKeys;

    async fn run(&self, query: &Query) -> Result<Self::Keys, StoreError> {
        self.inner.run(query).await
    }

    async fn get_multi<E: Entity>(&self, entities: &mut [E]) -> Result<(), FetchError> {
        if self.fetches.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        self.inner.get_multi(entities).await
    }
}

#[tokio::test]
async fn chunks_may_arrive_out_of_order_but_none_are_lost() {
    let store = Arc::new(SlowFirstFetch {
        inner: seed(false),
        fetches: AtomicUsize::new(0),
    });
    let units: Vec<_> = Pipeline::new(store, options()).stream(hoge_query()).collect().await;

    let chunks: Vec<Vec<Hoge>> = units.into_iter().map(Result::unwrap).collect();
    assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), ALL_RECORDS as usize);

    let first_ids: Vec<_> = chunks.iter().map(|c| c[0].key.int_id().unwrap()).collect();
    assert_ne!(first_ids[0], 1, "slow first chunk should not arrive first");

    for chunk in &chunks {
        let ids: Vec<_> = chunk.iter().map(|h| h.key.int_id().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "chunk contents keep their order");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn chunk_count_is_ceil_n_over_c(n in 1i64..120, c in 1usize..25) {
        let store = MemoryStore::new();
        for id in 1..=n {
            store.put(Key::new("Item", id), PropertyMap::new());
        }
        let options = Options::new(|_, key, _| vec![DynamicRecord::stub(key, &[])]).with_chunk_size(c);

        let (chunks, records, err) = tokio_test::block_on(async {
            drain(Pipeline::new(Arc::new(store), options).stream(Query::new("Item"))).await
        });

        prop_assert!(err.is_none());
        prop_assert_eq!(chunks, (n as usize).div_ceil(c));
        prop_assert_eq!(records, n as usize);
    }
}
