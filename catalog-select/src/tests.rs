use crate::*;

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }
}

fn item(id: &str, available: u32) -> Arc<CatalogItem> {
    Arc::new(
        CatalogItem::new(id, format!("Item {id}"))
            .with_sku(format!("SKU-{id}"))
            .with_availability(Availability::total(available)),
    )
}

fn blocked_item(id: &str) -> Arc<CatalogItem> {
    Arc::new(CatalogItem::new(id, "Blocked").with_blocked(Some("maintenance".into())))
}

fn items(n: usize) -> Vec<Arc<CatalogItem>> {
    (0..n).map(|i| item(&format!("item-{i}"), 1)).collect()
}

fn result(items: Vec<Arc<CatalogItem>>, sequence: u64) -> SearchResult {
    let total = items.len();
    SearchResult::new(items, total, false, sequence)
}

fn key(term: &str) -> QueryKey {
    QueryKey::new(term, &SearchFilters::default(), 50)
}

// Slow, obviously-correct reference for the window formula.
fn expected_range(off: u64, view: u32, h: u32, count: usize, overscan: usize) -> VirtualRange {
    if count == 0 || h == 0 || view == 0 {
        return VirtualRange::EMPTY;
    }
    let max = (count as u64 * h as u64).saturating_sub(view as u64);
    let off = off.min(max);
    let end = off + view as u64;
    let mut first = None;
    let mut last = 0usize;
    for i in 0..count {
        let top = i as u64 * h as u64;
        let bottom = top + h as u64;
        if bottom > off && top < end {
            first.get_or_insert(i);
            last = i;
        }
    }
    let first = first.unwrap_or(count - 1);
    let start = first.saturating_sub(overscan);
    let last = (last + overscan).min(count - 1).max(start);
    VirtualRange {
        start_index: start,
        end_index: last + 1,
    }
}

// --- SearchSession ---

#[test]
fn debounce_coalesces_keystrokes_into_one_query() {
    let mut s = SearchSession::new(300);
    s.set_term("c", 0);
    assert_eq!(s.tick(100), None);
    s.set_term("ca", 100);
    assert_eq!(s.tick(250), None);
    s.set_term("cam", 250);
    assert_eq!(s.tick(500), None);
    assert_eq!(s.next_deadline_ms(), Some(550));

    let q = s.tick(550).unwrap();
    assert_eq!(q.term, "cam");
    assert_eq!(q.sequence, 1);
    assert_eq!(s.latest_issued(), 1);
    assert_eq!(s.tick(10_000), None);
}

#[test]
fn flush_issues_pending_term_early() {
    let mut s = SearchSession::new(300);
    s.set_term("drill", 0);
    let q = s.flush().unwrap();
    assert_eq!(q.term, "drill");
    assert!(!s.is_debouncing());
    assert_eq!(s.flush(), None);
}

#[test]
fn slower_older_response_is_discarded() {
    let mut s = SearchSession::new(0);
    s.set_term("x", 0);
    let a = s.tick(0).unwrap();
    s.set_term("xy", 100);
    let b = s.tick(100).unwrap();
    assert!(b.sequence > a.sequence);

    assert_eq!(
        s.resolve(b.sequence),
        Resolution::Accepted {
            sequence: b.sequence,
            replaced: None
        }
    );
    assert_eq!(
        s.resolve(a.sequence),
        Resolution::Stale {
            sequence: a.sequence,
            displayed: b.sequence
        }
    );
    assert_eq!(s.displayed_sequence(), Some(b.sequence));
    assert!(!s.is_loading());
}

#[test]
fn in_order_responses_are_both_applied() {
    let mut s = SearchSession::new(0);
    let a = s.issue_now();
    let b = s.issue_now();
    assert!(s.resolve(a.sequence).is_accepted());
    assert_eq!(
        s.resolve(b.sequence),
        Resolution::Accepted {
            sequence: b.sequence,
            replaced: Some(a.sequence)
        }
    );
}

#[test]
fn cancel_ignores_in_flight_and_pending() {
    let mut s = SearchSession::new(300);
    let a = s.issue_now();
    s.set_term("late", 10);
    s.cancel();
    assert_eq!(s.tick(1_000), None);
    assert_eq!(
        s.resolve(a.sequence),
        Resolution::Cancelled {
            sequence: a.sequence
        }
    );
    assert!(!s.is_loading());

    let b = s.issue_now();
    assert!(s.resolve(b.sequence).is_accepted());
}

#[test]
fn set_filters_issues_immediately_and_drops_debounce() {
    let mut s = SearchSession::new(300);
    s.set_term("tent", 0);
    let q = s.set_filters(SearchFilters::default().with_location("north"));
    assert_eq!(q.term, "tent");
    assert_eq!(q.filters.location_id.as_deref(), Some("north"));
    assert_eq!(s.next_deadline_ms(), None);
    assert_eq!(s.tick(1_000), None);
}

#[test]
fn failure_surfaces_only_for_newest_query() {
    let mut s = SearchSession::new(0);
    let a = s.issue_now();
    let b = s.issue_now();
    assert_eq!(s.fail(a.sequence), Failure::Superseded { sequence: a.sequence });
    assert_eq!(s.fail(b.sequence), Failure::Surface { sequence: b.sequence });

    let r = s.retry().unwrap();
    assert_eq!(r.sequence, b.sequence + 1);
    assert_eq!(r.term, b.term);
}

#[test]
fn retry_leaves_current_term_and_debounce_alone() {
    let mut s = SearchSession::new(300);
    s.set_term("abc", 0);
    let a = s.tick(300).unwrap();

    s.set_debounce_ms(100);
    assert_eq!(s.debounce_ms(), 100);
    s.set_term("x", 400);

    let r = s.retry().unwrap();
    assert_eq!(r.term, "abc");
    assert!(r.sequence > a.sequence);
    assert_eq!(s.term(), "x");
    assert_eq!(s.next_deadline_ms(), Some(500));

    let q = s.tick(500).unwrap();
    assert_eq!(q.term, "x");
    assert!(q.sequence > r.sequence);
}

#[test]
fn unknown_sequences_are_rejected() {
    let mut s = SearchSession::new(0);
    assert_eq!(s.resolve(0), Resolution::Unknown { sequence: 0 });
    assert_eq!(s.resolve(7), Resolution::Unknown { sequence: 7 });
    assert_eq!(s.retry(), None);
}

// --- ResultCache ---

#[test]
fn cache_serves_fresh_then_stale_then_misses() {
    let mut c = ResultCache::new(CachePolicy {
        stale_time_ms: 100,
        cache_time_ms: 1_000,
        max_entries: None,
    });
    c.set(key("cam"), result(items(3), 1), 0);

    assert!(matches!(c.get(&key("cam"), 50), CacheLookup::Fresh(_)));

    match c.get(&key("cam"), 200) {
        CacheLookup::Stale { result, refresh } => {
            assert_eq!(result.items.len(), 3);
            assert!(refresh);
        }
        other => panic!("expected stale, got {other:?}"),
    }
    // Only the first stale read asks for a refresh.
    assert!(matches!(
        c.get(&key("cam"), 300),
        CacheLookup::Stale { refresh: false, .. }
    ));

    assert!(c.get(&key("cam"), 1_000).is_miss());
    assert!(c.is_empty());

    let stats = c.stats();
    assert_eq!(stats.fresh_hits, 1);
    assert_eq!(stats.stale_hits, 2);
    assert_eq!(stats.misses, 1);
}

#[test]
fn rewrite_and_release_reset_refresh_mark() {
    let mut c = ResultCache::new(CachePolicy {
        stale_time_ms: 0,
        cache_time_ms: 1_000,
        max_entries: None,
    });
    c.set(key("a"), result(items(1), 1), 0);
    assert!(matches!(c.get(&key("a"), 1), CacheLookup::Stale { refresh: true, .. }));
    c.release_refresh(&key("a"));
    assert!(matches!(c.get(&key("a"), 2), CacheLookup::Stale { refresh: true, .. }));
    c.set(key("a"), result(items(1), 2), 3);
    assert!(matches!(c.get(&key("a"), 4), CacheLookup::Stale { refresh: true, .. }));
}

#[test]
fn malformed_entries_are_misses() {
    let mut c = ResultCache::<QueryKey>::default();
    let dup = vec![item("a", 1), item("a", 1)];
    c.set(key("dup"), result(dup, 1), 0);
    assert!(c.get(&key("dup"), 1).is_miss());
    assert!(c.is_empty());

    let undercount = SearchResult::new(items(3), 1, false, 1);
    c.set(key("under"), undercount, 0);
    assert!(c.get(&key("under"), 1).is_miss());

    c.set(key("future"), result(items(1), 1), 500);
    assert!(c.get(&key("future"), 100).is_miss());
}

#[test]
fn policy_change_applies_to_stored_entries() {
    let mut c = ResultCache::new(CachePolicy {
        stale_time_ms: 1_000,
        cache_time_ms: 5_000,
        max_entries: None,
    });
    c.set(key("cam"), result(items(2), 1), 0);
    assert!(matches!(c.get(&key("cam"), 500), CacheLookup::Fresh(_)));

    c.set_policy(CachePolicy {
        stale_time_ms: 100,
        cache_time_ms: 400,
        max_entries: None,
    });
    assert!(c.get(&key("cam"), 500).is_miss());
    assert!(c.is_empty());
}

#[test]
fn invalidate_and_purge() {
    let mut c = ResultCache::new(CachePolicy {
        stale_time_ms: 10,
        cache_time_ms: 100,
        max_entries: None,
    });
    c.set(key("drill"), result(vec![item("d1", 1)], 1), 0);
    c.set(key("saw"), result(vec![item("s1", 1)], 2), 50);
    c.set(key("tent"), result(vec![item("t1", 1)], 3), 90);

    let removed = c.invalidate(|_, r| r.contains(&ItemId::from("s1")));
    assert_eq!(removed, 1);
    assert_eq!(c.len(), 2);

    assert_eq!(c.purge_expired(120), 1);
    assert_eq!(c.len(), 1);
    assert!(!c.get(&key("tent"), 120).is_miss());
}

#[test]
fn capacity_evicts_oldest() {
    let mut c = ResultCache::new(CachePolicy {
        stale_time_ms: 1_000,
        cache_time_ms: 10_000,
        max_entries: Some(2),
    });
    c.set(key("a"), result(items(1), 1), 0);
    c.set(key("b"), result(items(1), 2), 10);
    c.set(key("c"), result(items(1), 3), 20);
    assert_eq!(c.len(), 2);
    assert!(c.get(&key("a"), 30).is_miss());
    assert!(!c.get(&key("c"), 30).is_miss());
    assert_eq!(c.stats().evictions, 1);
}

#[test]
fn query_key_normalizes_term_and_ignores_sequence() {
    let f = SearchFilters::default().with_category("lifts");
    let a = SearchQuery {
        term: "  scissor   lift ".into(),
        filters: f.clone(),
        sequence: 1,
    };
    let b = SearchQuery {
        term: "scissor lift".into(),
        filters: f.clone().with_min_available(3),
        sequence: 9,
    };
    assert_eq!(a.key(50), b.key(50));
    assert_ne!(a.key(50), a.key(20));
    assert_eq!(normalize_term("\t a  b\n"), "a b");
}

// --- FilterPipeline ---

#[test]
fn availability_per_location() {
    let stock = Availability {
        total_available: 5,
        per_location: vec![
            LocationStock {
                location_id: "north".into(),
                available: 3,
            },
            LocationStock {
                location_id: "south".into(),
                available: 2,
            },
        ],
    };
    assert_eq!(stock.at("north"), 3);
    assert_eq!(stock.at("south"), 2);
    assert_eq!(stock.at("east"), 0);
    assert_eq!(Availability::total(4).at("north"), 0);
}

#[test]
fn filter_preserves_relative_order() {
    let list = vec![item("A", 0), item("B", 5), item("C", 2)];
    let out = apply(&list, |it| it.availability.total_available >= 1);
    let ids: Vec<&str> = out.iter().map(|it| it.id.as_str()).collect();
    assert_eq!(ids, ["B", "C"]);
    // Input untouched, items shared.
    assert_eq!(list.len(), 3);
    assert!(Arc::ptr_eq(&out[0], &list[1]));
}

#[test]
fn pipeline_combines_threshold_and_predicates() {
    let list = vec![item("A", 0), item("B", 5), blocked_item("C"), item("D", 2)];
    let p = FilterPipeline::new().with_min_available(Some(1));
    assert_eq!(p.apply(&list).len(), 2);

    let p = FilterPipeline::new()
        .with_min_available(Some(1))
        .with_predicate(|it| it.availability.total_available < 5);
    let out = p.apply(&list);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id.as_str(), "D");

    let pass = FilterPipeline::new();
    assert!(pass.is_passthrough());
    assert_eq!(pass.apply(&list).len(), 4);
}

// --- SelectionMachine ---

#[test]
fn arrow_down_clamps_at_last_item() {
    let list = items(5);
    let mut m = SelectionMachine::new();
    assert_eq!(m.on_key(NavKey::ArrowDown, &list), Transition::Opened);
    assert_eq!(m.state().highlighted_signed(), -1);

    let mut seen = vec![m.state().highlighted_signed()];
    for _ in 0..5 {
        m.on_key(NavKey::ArrowDown, &list);
        seen.push(m.state().highlighted_signed());
    }
    assert_eq!(seen, [-1, 0, 1, 2, 3, 4]);
    assert_eq!(m.on_key(NavKey::ArrowDown, &list), Transition::Ignored);
    assert_eq!(m.highlighted_index(), Some(4));
}

#[test]
fn arrow_up_stops_at_no_highlight() {
    let list = items(3);
    let mut m = SelectionMachine::new();
    m.open();
    m.on_key(NavKey::ArrowDown, &list);
    m.on_key(NavKey::ArrowDown, &list);
    assert_eq!(m.on_key(NavKey::ArrowUp, &list), Transition::Highlighted(Some(0)));
    assert_eq!(m.on_key(NavKey::ArrowUp, &list), Transition::Highlighted(None));
    assert_eq!(m.on_key(NavKey::ArrowUp, &list), Transition::Ignored);
}

#[test]
fn navigation_on_empty_list_is_total() {
    let mut m = SelectionMachine::new();
    m.open();
    assert_eq!(m.on_key(NavKey::ArrowDown, &[]), Transition::Ignored);
    assert_eq!(m.on_key(NavKey::Enter, &[]), Transition::Ignored);
    assert_eq!(m.hover(3, &[]), Transition::Ignored);
    assert_eq!(m.select(0, &[]), Transition::Ignored);
    assert_eq!(m.highlighted_index(), None);
}

#[test]
fn enter_commits_and_closes() {
    let list = items(3);
    let mut m = SelectionMachine::new();
    m.set_search_term("item".into());
    assert!(m.is_open());
    m.on_key(NavKey::ArrowDown, &list);
    m.on_key(NavKey::ArrowDown, &list);
    let t = m.on_key(NavKey::Enter, &list);
    assert_eq!(
        t,
        Transition::Committed {
            id: ItemId::from("item-1"),
            index: 1
        }
    );
    assert!(!m.is_open());
    assert_eq!(m.selected_id(), Some(&ItemId::from("item-1")));
    assert_eq!(m.search_term(), "");
}

#[test]
fn blocked_item_cannot_be_committed() {
    let list = vec![item("a", 1), blocked_item("b")];
    let mut m = SelectionMachine::new();
    m.open();
    m.on_key(NavKey::ArrowDown, &list);
    m.on_key(NavKey::ArrowDown, &list);
    assert_eq!(m.highlighted_index(), Some(1));

    assert_eq!(m.on_key(NavKey::Enter, &list), Transition::Rejected { index: 1 });
    assert!(m.is_open());
    assert_eq!(m.selected_id(), None);

    assert_eq!(m.select(1, &list), Transition::Rejected { index: 1 });
    assert!(m.is_open());
}

#[test]
fn closed_keys_open_without_highlight() {
    let list = items(3);
    for key in [NavKey::ArrowDown, NavKey::ArrowUp, NavKey::Enter] {
        let mut m = SelectionMachine::new();
        assert_eq!(m.on_key(key, &list), Transition::Opened);
        assert_eq!(m.highlighted_index(), None);
    }
    let mut m = SelectionMachine::new();
    assert_eq!(m.on_key(NavKey::Escape, &list), Transition::Ignored);
    assert_eq!(m.on_key(NavKey::Tab, &list), Transition::Ignored);
}

#[test]
fn escape_clears_term_and_tab_keeps_selection() {
    let list = items(2);
    let mut m = SelectionMachine::new();
    m.open();
    m.on_key(NavKey::ArrowDown, &list);
    m.on_key(NavKey::Enter, &list);
    assert_eq!(m.selected_id(), Some(&ItemId::from("item-0")));

    m.set_search_term("zz".into());
    assert_eq!(
        m.on_key(NavKey::Escape, &list),
        Transition::Closed(CloseReason::Escape)
    );
    assert_eq!(m.search_term(), "");
    assert_eq!(m.selected_id(), Some(&ItemId::from("item-0")));

    m.set_search_term("yy".into());
    assert_eq!(m.on_key(NavKey::Tab, &list), Transition::Closed(CloseReason::Tab));
    assert_eq!(m.selected_id(), Some(&ItemId::from("item-0")));

    m.open();
    assert_eq!(
        m.handle(SelectionEvent::FocusLost, &list),
        Transition::Closed(CloseReason::FocusLost)
    );
    assert_eq!(m.search_term(), "");
}

#[test]
fn selection_survives_replacement_highlight_does_not() {
    let before = vec![item("item-41", 1), item("item-42", 1)];
    let mut m = SelectionMachine::new();
    m.open();
    m.on_key(NavKey::ArrowDown, &before);
    m.on_key(NavKey::ArrowDown, &before);
    m.on_key(NavKey::Enter, &before);
    assert_eq!(m.selected_id(), Some(&ItemId::from("item-42")));

    let after = vec![item("item-7", 1), item("item-8", 1)];
    m.open();
    m.on_key(NavKey::ArrowDown, &after);
    assert_eq!(m.highlighted_index(), Some(0));
    m.handle(SelectionEvent::ResultsReplaced, &after);
    assert_eq!(m.highlighted_index(), None);
    assert_eq!(m.selected_id(), Some(&ItemId::from("item-42")));
}

#[test]
fn clear_resets_everything_but_open_state() {
    let list = items(2);
    let mut m = SelectionMachine::new();
    m.open();
    m.on_key(NavKey::ArrowDown, &list);
    m.on_key(NavKey::Enter, &list);
    m.set_search_term("abc".into());
    m.on_key(NavKey::ArrowDown, &list);

    assert_eq!(m.handle(SelectionEvent::Clear, &list), Transition::Cleared);
    assert_eq!(m.selected_id(), None);
    assert_eq!(m.search_term(), "");
    assert_eq!(m.highlighted_index(), None);
    assert!(m.is_open());
}

#[test]
fn hover_clamps_and_reconcile_shrinks_highlight() {
    let list = items(4);
    let mut m = SelectionMachine::new();
    m.open();
    assert_eq!(m.hover(99, &list), Transition::Highlighted(Some(3)));
    assert_eq!(m.reconcile_len(2), Transition::Highlighted(Some(1)));
    assert_eq!(m.reconcile_len(0), Transition::Highlighted(None));
}

#[test]
fn random_events_keep_highlight_in_bounds() {
    let mut rng = Lcg::new(0x5eed);
    let mut m = SelectionMachine::new();
    let mut list = items(6);
    for _ in 0..2_000 {
        let ev = match rng.gen_range_usize(0, 9) {
            0 => SelectionEvent::Key(NavKey::ArrowDown),
            1 => SelectionEvent::Key(NavKey::ArrowUp),
            2 => SelectionEvent::Key(NavKey::Enter),
            3 => SelectionEvent::Key(NavKey::Escape),
            4 => SelectionEvent::Key(NavKey::Tab),
            5 => SelectionEvent::Hover(rng.gen_range_usize(0, 20)),
            6 => SelectionEvent::Select(rng.gen_range_usize(0, 20)),
            7 => SelectionEvent::Focus,
            _ => {
                list = items(rng.gen_range_usize(0, 8));
                SelectionEvent::ResultsReplaced
            }
        };
        m.handle(ev, &list);
        if let Some(h) = m.highlighted_index() {
            assert!(h < list.len(), "highlight {h} out of bounds for {}", list.len());
        }
    }
}

// --- VirtualWindow ---

#[test]
fn window_bound_is_independent_of_count() {
    let r = compute_visible_range(0, 320, 80, 100_000, 2);
    assert_eq!(r.start_index, 0);
    assert!(r.len() <= 8);

    for page in [5u64, 10, 1_000, 50_000, 99_990] {
        let r = compute_visible_range(page * 80, 320, 80, 100_000, 2);
        assert!(r.len() <= 8, "len {} at page {page}", r.len());
    }
    for count in [1_000usize, 100_000, 1_000_000] {
        let r = compute_visible_range(400, 320, 80, count, 2);
        assert_eq!(r.len(), 8);
    }
}

#[test]
fn window_range_matches_reference() {
    let mut rng = Lcg::new(42);
    for _ in 0..500 {
        let count = rng.gen_range_usize(0, 300);
        let h = rng.gen_range_u32(1, 60);
        let view = rng.gen_range_u32(1, 500);
        let overscan = rng.gen_range_usize(0, 4);
        let off = rng.gen_range_u64(0, 20_000);

        let got = compute_visible_range(off, view, h, count, overscan);
        let want = expected_range(off, view, h, count, overscan);
        assert_eq!(got, want, "off={off} view={view} h={h} count={count} os={overscan}");
        if count > 0 {
            let bound = view.div_ceil(h) as usize + 1 + 2 * overscan;
            assert!(got.len() <= bound);
            assert!(got.end_index <= count);
        }
    }
}

#[test]
fn degenerate_geometry_is_empty() {
    assert!(compute_visible_range(0, 320, 80, 0, 2).is_empty());
    assert!(compute_visible_range(0, 320, 0, 10, 2).is_empty());
    assert!(compute_visible_range(0, 0, 80, 10, 2).is_empty());
}

#[test]
fn overscrolled_offset_is_clamped() {
    let r = compute_visible_range(1_000_000, 320, 80, 10, 0);
    assert_eq!(r, VirtualRange { start_index: 6, end_index: 10 });
}

#[test]
fn below_threshold_materializes_everything() {
    let w = VirtualWindow::new(
        WindowOptions::new(20, 80)
            .with_viewport_height(320)
            .with_virtualize_threshold(50),
    );
    assert!(!w.is_virtualized());
    assert_eq!(w.visible_range(), VirtualRange { start_index: 0, end_index: 20 });

    let w = VirtualWindow::new(
        WindowOptions::new(51, 80)
            .with_viewport_height(320)
            .with_virtualize_threshold(50),
    );
    assert!(w.is_virtualized());
    assert_eq!(w.visible_range().len(), 6);
}

#[test]
fn smart_scroll_only_moves_when_needed() {
    let mut w = VirtualWindow::new(WindowOptions::new(100, 80).with_viewport_height(320));
    w.set_scroll_offset(800);

    // Rows 10..=13 are fully visible.
    assert_eq!(w.scroll_to_index_offset(10, Align::Auto), 800);
    assert_eq!(w.scroll_to_index_offset(13, Align::Auto), 800);
    // Below: bottom edge aligns with viewport bottom.
    assert_eq!(w.scroll_to_index_offset(14, Align::Auto), 15 * 80 - 320);
    // Above: top edge aligns with viewport top.
    assert_eq!(w.scroll_to_index_offset(9, Align::Auto), 9 * 80);

    assert_eq!(w.scroll_to_index_offset(50, Align::Start), 4_000);
    assert_eq!(w.scroll_to_index_offset(50, Align::Center), 4_000 + 40 - 160);
    assert_eq!(w.scroll_to_index_offset(99, Align::Start), w.max_scroll_offset());

    assert_eq!(w.scroll_to_index(14, Align::Auto), 880);
    assert_eq!(w.scroll_offset(), 880);
}

#[test]
fn partially_visible_row_scrolls_into_view() {
    let mut w = VirtualWindow::new(WindowOptions::new(100, 80).with_viewport_height(320));
    w.set_scroll_offset(810);
    // Row 10 starts at 800, above the viewport top.
    assert_eq!(w.scroll_to_index_offset(10, Align::Auto), 800);
    // Row 14 ends at 1200, below the viewport bottom at 1130.
    assert_eq!(w.scroll_to_index_offset(14, Align::Auto), 880);
}

#[test]
fn shrinking_list_clamps_offset() {
    let mut w = VirtualWindow::new(WindowOptions::new(1_000, 80).with_viewport_height(320));
    w.set_scroll_offset(40_000);
    assert_eq!(w.scroll_offset(), 40_000);

    w.set_count(10);
    assert_eq!(w.scroll_offset(), 10 * 80 - 320);

    w.set_count(2);
    assert_eq!(w.scroll_offset(), 0);

    w.set_count(0);
    assert_eq!(w.scroll_offset(), 0);
    assert!(w.visible_range().is_empty());
}

#[test]
fn rows_carry_geometry() {
    let mut w = VirtualWindow::new(
        WindowOptions::new(1_000, 40)
            .with_viewport_height(100)
            .with_overscan(1),
    );
    w.set_scroll_offset(400);
    let mut rows = Vec::new();
    w.collect_rows(&mut rows);
    let idx: Vec<usize> = rows.iter().map(|r| r.index).collect();
    assert_eq!(idx, [9, 10, 11, 12, 13]);
    assert_eq!(rows[0].top, 360);
    assert_eq!(rows[0].bottom(), 400);
    assert_eq!(w.index_at_offset(401), Some(10));
    assert_eq!(w.index_at_offset(u64::MAX), Some(999));
}

#[test]
fn update_options_reclamps_and_indices_follow_range() {
    let mut w = VirtualWindow::new(
        WindowOptions::new(1_000, 40)
            .with_viewport_height(100)
            .with_overscan(0),
    );
    w.set_scroll_offset(400);
    let range = w.visible_range();
    assert_eq!(range, VirtualRange { start_index: 10, end_index: 13 });
    assert_eq!(range.last_index(), Some(12));

    let mut seen = Vec::new();
    w.for_each_index(|i| seen.push(i));
    assert_eq!(seen, [10, 11, 12]);

    w.update_options(|o| o.count = 5);
    assert_eq!(w.options().count, 5);
    assert_eq!(w.scroll_offset(), 5 * 40 - 100);
    assert_eq!(w.visible_range().last_index(), Some(4));
    assert_eq!(VirtualRange::EMPTY.last_index(), None);
}

#[test]
fn batch_update_coalesces_on_change() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let mut w = VirtualWindow::new(
        WindowOptions::new(1_000, 10)
            .with_viewport_height(100)
            .with_on_change(Some(|_: &VirtualWindow| {
                CALLS.fetch_add(1, Ordering::Relaxed);
            })),
    );
    CALLS.store(0, Ordering::Relaxed);

    w.apply_scroll_frame(200, 500);
    assert_eq!(CALLS.load(Ordering::Relaxed), 1);

    w.set_scroll_offset(500);
    assert_eq!(CALLS.load(Ordering::Relaxed), 1);
    w.set_scroll_offset(600);
    assert_eq!(CALLS.load(Ordering::Relaxed), 2);
}

#[test]
fn viewport_state_roundtrip() {
    let mut w = VirtualWindow::new(WindowOptions::new(500, 20).with_viewport_height(200));
    w.set_scroll_offset(1_234);
    let snap = w.viewport_state();
    assert_eq!(snap.rows_per_page(), 10);

    let mut other = VirtualWindow::new(WindowOptions::new(500, 1));
    other.restore_viewport_state(snap);
    assert_eq!(other.viewport_state(), snap);
    assert_eq!(other.visible_range(), w.visible_range());
}

// --- Config ---

#[test]
fn default_config_is_valid_and_wires_components() {
    let cfg = PickerConfig::default();
    assert_eq!(cfg.debounce_ms, 300);
    assert_eq!(cfg.validate(), Ok(()));

    let cfg = cfg.with_min_available_quantity(Some(2)).with_overscan(1);
    assert_eq!(cfg.filter_pipeline().min_available(), Some(2));
    assert_eq!(cfg.window_options(10).overscan, 1);
    assert_eq!(cfg.cache_policy().stale_time_ms, 30_000);
    assert_eq!(cfg.search_session().debounce_ms(), 300);
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = PickerConfig::default().with_item_height(0);
    assert_eq!(cfg.validate(), Err(ConfigError::ZeroItemHeight));

    let cfg = PickerConfig::default()
        .with_stale_time_ms(10)
        .with_cache_time_ms(5);
    let err = cfg.validate().unwrap_err();
    assert_eq!(
        format!("{err}"),
        String::from("stale_time_ms (10) exceeds cache_time_ms (5)")
    );
}

#[cfg(feature = "serde")]
#[test]
fn config_deserializes_with_defaults() {
    let cfg: PickerConfig =
        serde_json::from_str(r#"{ "debounce_ms": 150, "min_available_quantity": 1 }"#).unwrap();
    assert_eq!(cfg.debounce_ms, 150);
    assert_eq!(cfg.min_available_quantity, Some(1));
    assert_eq!(cfg.item_height, 80);
}
