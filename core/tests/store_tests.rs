use comicdex_core::{BuildResult, Document, IndexError, IndexStore, PostingsList, QueryEngine};
use tempfile::tempdir;

fn doc(id: u32, title: &str, transcript: &str) -> Document {
    Document {
        id,
        title: title.into(),
        safe_title: title.into(),
        transcript: transcript.into(),
        link: format!("https://xkcd.com/{id}"),
        ..Document::default()
    }
}

#[test]
fn index_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = IndexStore::open(dir.path()).unwrap();
        let mut run = BuildResult::new(1);
        run.add_document(doc(1, "Barrel - Part 1", "A boy sits in a barrel"));
        run.add_document(doc(2, "Petit Trees (sketch)", "Trees and a barrel"));
        store.flush(&run).unwrap();
    }

    let store = IndexStore::open(dir.path()).unwrap();
    assert_eq!(store.cursor().unwrap(), Some(3));
    assert_eq!(store.postings("barrel").unwrap().as_slice(), &[1, 2]);
    assert_eq!(store.document(2).unwrap().unwrap().title, "Petit Trees (sketch)");

    let engine = QueryEngine::new(store);
    let hits = engine.search("barrel trees").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, 2);
}

#[test]
fn incremental_runs_merge_postings() {
    let store = IndexStore::temporary().unwrap();
    let mut first = BuildResult::new(1);
    first.add_document(doc(1, "comic", ""));
    first.add_document(doc(2, "comic", ""));
    store.flush(&first).unwrap();

    let mut second = BuildResult::new(3);
    second.add_document(doc(5, "comic", ""));
    let stats = store.flush(&second).unwrap();

    assert_eq!(stats.cursor, 6);
    assert_eq!(store.postings("comic").unwrap().as_slice(), &[1, 2, 5]);
    assert_eq!(store.stats().unwrap().documents, 3);
}

#[test]
fn every_stored_postings_list_is_strictly_ascending() {
    let store = IndexStore::temporary().unwrap();
    for (start, ids) in [(1, vec![1u32, 2, 3]), (4, vec![4, 6]), (1, vec![2, 3])] {
        let mut run = BuildResult::new(start);
        for id in ids {
            run.add_document(doc(id, "shared words", &format!("only{id}")));
        }
        store.flush(&run).unwrap();
    }
    for entry in store.scan_postings() {
        let (term, ids) = entry.unwrap();
        assert!(ids.as_slice().windows(2).all(|w| w[0] < w[1]), "{term} is not ascending");
    }
    assert_eq!(store.postings("shared").unwrap().as_slice(), &[1, 2, 3, 4, 6]);
}

#[test]
fn merge_postings_and_put_document_upsert() {
    let store = IndexStore::temporary().unwrap();
    assert_eq!(store.merge_postings("xkcd", &PostingsList::from_ids([3, 1])).unwrap(), 2);
    assert_eq!(store.merge_postings("xkcd", &PostingsList::from_ids([1, 2])).unwrap(), 1);
    assert_eq!(store.postings("xkcd").unwrap().as_slice(), &[1, 2, 3]);
    assert!(store.postings("missing").unwrap().is_empty());

    store.put_document(&doc(9, "before", "")).unwrap();
    store.put_document(&doc(9, "after", "")).unwrap();
    let docs: Vec<_> = store.scan_documents().collect::<Result<_, _>>().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].1.title, "after");
}

#[test]
fn scan_documents_is_in_numeric_order() {
    let store = IndexStore::temporary().unwrap();
    for id in [300u32, 2, 70_000, 256] {
        store.put_document(&doc(id, "t", "")).unwrap();
    }
    let ids: Vec<u32> = store.scan_documents().map(|e| e.unwrap().0).collect();
    assert_eq!(ids, vec![2, 256, 300, 70_000]);
}

#[test]
fn cursor_overwrites() {
    let store = IndexStore::temporary().unwrap();
    assert_eq!(store.cursor().unwrap(), None);
    store.set_cursor(10).unwrap();
    store.set_cursor(7).unwrap();
    assert_eq!(store.cursor().unwrap(), Some(7));
}

#[test]
fn failed_flush_leaves_every_table_unchanged() {
    let dir = tempdir().unwrap();
    {
        let db = sled::open(dir.path()).unwrap();
        db.open_tree("postings").unwrap().insert(b"zzz", &[0u8, 0, 1][..]).unwrap();
        db.flush().unwrap();
    }

    let store = IndexStore::open(dir.path()).unwrap();
    let mut run = BuildResult::new(1);
    run.add_document(doc(1, "aaa zzz", ""));
    let err = store.flush(&run).unwrap_err();

    assert!(matches!(err, IndexError::Corrupt(_)), "unexpected error: {err}");
    assert_eq!(store.cursor().unwrap(), None);
    assert!(store.document(1).unwrap().is_none());
    assert!(store.postings("aaa").unwrap().is_empty());
    assert_eq!(store.stats().unwrap().documents, 0);
}
