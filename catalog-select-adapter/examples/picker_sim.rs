use std::collections::VecDeque;

use catalog_select::{Availability, CatalogItem, NavKey, PickerConfig};
use catalog_select_adapter::{FetchRequest, Picker, PickerEvent, ProviderResponse};

fn catalog(term: &str) -> ProviderResponse {
    let items: Vec<_> = (0..12)
        .map(|i| {
            CatalogItem::new(format!("{term}-{i}"), format!("{term} #{i}"))
                .with_sku(format!("{}-{i:03}", term.to_uppercase()))
                .with_availability(Availability::total(i % 3))
        })
        .collect();
    let total = items.len();
    ProviderResponse::new(items, total, false)
}

fn main() {
    // Example: a host loop driving the synchronous picker without an async runtime.
    //
    // A host would:
    // - forward keystrokes and key events with the current time
    // - call tick(now_ms) once next_deadline_ms() has passed
    // - perform each returned FetchRequest and report back via on_response
    // - render from snapshot()
    let Ok(mut p) = Picker::new(PickerConfig::default().with_min_available_quantity(Some(1)))
    else {
        return;
    };

    // Simulated network: every request answers 120 ms after it was issued.
    let mut network: VecDeque<(u64, FetchRequest)> = VecDeque::new();
    let typed = [(0, "d"), (90, "dr"), (180, "dri"), (260, "drill")];

    let mut now_ms = 0u64;
    let mut next_key = 0;
    while now_ms <= 1_200 {
        if let Some(&(at, term)) = typed.get(next_key) {
            if at == now_ms {
                next_key += 1;
                if let Some(fetch) = p.set_search_term(term, now_ms) {
                    network.push_back((now_ms + 120, fetch));
                }
            }
        }
        if p.next_deadline_ms().is_some_and(|d| d <= now_ms) {
            if let Some(fetch) = p.tick(now_ms) {
                println!("t={now_ms} fetch seq={} term={:?}", fetch.sequence, fetch.request.term);
                network.push_back((now_ms + 120, fetch));
            }
        }
        while network.front().is_some_and(|(due, _)| *due <= now_ms) {
            if let Some((_, fetch)) = network.pop_front() {
                p.on_response(fetch.sequence, Ok(catalog(&fetch.request.term)), now_ms);
            }
        }
        for event in p.drain_events() {
            match event {
                PickerEvent::SearchEnded { sequence, items } => {
                    println!("t={now_ms} seq={sequence} showing {} items", items.len())
                }
                other => println!("t={now_ms} {other:?}"),
            }
        }
        now_ms += 10;
    }

    p.on_key(NavKey::ArrowDown, now_ms);
    p.on_key(NavKey::ArrowDown, now_ms);
    let snap = p.snapshot();
    for row in &snap.rows {
        let marker = if row.highlighted { ">" } else { " " };
        println!(
            "{marker} {} ({} available)",
            row.item.label(),
            row.item.availability.total_available
        );
    }

    p.on_key(NavKey::Enter, now_ms);
    println!("display_text={:?}", p.display_text());
}
