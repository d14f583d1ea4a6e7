use std::cell::Cell;
use std::collections::HashMap;

use proptest::prelude::*;
use serde_json::{json, Value};
use spark_views::{
    AddOptions, Cid, Collection, CollectionViewManager, NestingView, Record, View, ViewClass,
    ViewId, ViewOptions,
};

#[derive(Debug, Clone)]
enum Op {
    Append,
    Insert { at: usize },
    Remove { index: usize },
    Reset { keep: Vec<bool>, fresh: usize, reverse: bool },
    Sort { descending: bool },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Append),
        any::<usize>().prop_map(|at| Op::Insert { at }),
        any::<usize>().prop_map(|index| Op::Remove { index }),
        (prop::collection::vec(any::<bool>(), 0..8), 0usize..3, any::<bool>())
            .prop_map(|(keep, fresh, reverse)| Op::Reset { keep, fresh, reverse }),
        any::<bool>().prop_map(|descending| Op::Sort { descending }),
    ]
}

struct Titles(Cell<usize>);

impl Titles {
    fn fresh(&self) -> Record {
        let n = self.0.get() + 1;
        self.0.set(n);
        Record::new(json!({"title": format!("t{n:04}")}))
    }
}

fn title(record: &Record) -> String {
    record
        .get("title")
        .and_then(|t| t.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn apply(collection: &Collection, titles: &Titles, op: &Op) {
    match op {
        Op::Append => {
            collection.add(titles.fresh());
        }
        Op::Insert { at } => {
            let at = at % (collection.len() + 1);
            collection.add_with(vec![titles.fresh()], AddOptions { at: Some(at), silent: false });
        }
        Op::Remove { index } => {
            if !collection.is_empty() {
                let victim = collection.at(index % collection.len());
                if let Some(victim) = victim {
                    collection.remove(&victim);
                }
            }
        }
        Op::Reset { keep, fresh, reverse } => {
            let mut next: Vec<Record> = collection
                .models()
                .into_iter()
                .zip(keep.iter().chain(std::iter::repeat(&false)))
                .filter(|(_, keep)| **keep)
                .map(|(record, _)| record)
                .collect();
            next.extend((0..*fresh).map(|_| titles.fresh()));
            if *reverse {
                next.reverse();
            }
            collection.reset(next);
        }
        Op::Sort { descending } => {
            let descending = *descending;
            collection.set_comparator(move |a, b| {
                let order = title(a).cmp(&title(b));
                if descending { order.reverse() } else { order }
            });
            collection.sort();
        }
    }
}

fn list(collection: &Collection) -> NestingView {
    let item = ViewClass::nesting().extend(ViewOptions::new().template(|data: Option<&Value>| {
        data.and_then(|d| d.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }));
    let mut view = NestingView::new(
        ViewOptions::new()
            .collection(collection.clone())
            .template(|_| "<ul><li></li></ul>".to_string())
            .items("ul", item),
    )
    .unwrap();
    view.render().unwrap();
    view
}

fn manager(view: &NestingView) -> &CollectionViewManager {
    view.managers()[0].as_collection().unwrap()
}

proptest! {
    #[test]
    fn test_children_mirror_collection(ops in prop::collection::vec(op(), 1..24)) {
        let titles = Titles(Cell::new(0));
        let collection = Collection::with_models((0..3).map(|_| titles.fresh()).collect());
        let view = list(&collection);
        let ul = view.query("ul").unwrap().remove(0);

        for op in &ops {
            let before: HashMap<Cid, ViewId> = manager(&view).identified().into_iter().collect();
            apply(&collection, &titles, op);

            let rendered: Vec<String> = ul.children().iter().map(|li| li.text_content()).collect();
            let expected: Vec<String> = collection.models().iter().map(title).collect();
            prop_assert_eq!(rendered, expected);
            prop_assert_eq!(manager(&view).identified_count(), collection.len());

            for record in collection.models() {
                if let Some(id) = before.get(&record.cid()) {
                    prop_assert_eq!(manager(&view).view_for(record.cid()), Some(*id));
                }
            }
        }
    }
}
