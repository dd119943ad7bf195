// Example: window a large result set and drive the selection machine by keyboard.
use std::sync::Arc;

use catalog_select::{
    Align, Availability, CatalogItem, FilterPipeline, NavKey, SelectionMachine, VirtualWindow,
    WindowOptions,
};

fn main() {
    let items: Vec<Arc<CatalogItem>> = (0..100_000)
        .map(|i| {
            Arc::new(
                CatalogItem::new(format!("item-{i}"), format!("Scaffold frame #{i}"))
                    .with_sku(format!("SF-{i:06}"))
                    .with_availability(Availability::total((i % 4) as u32)),
            )
        })
        .collect();

    let items = FilterPipeline::new()
        .with_min_available(Some(1))
        .apply(&items);
    println!("in stock: {}", items.len());

    let mut w = VirtualWindow::new(
        WindowOptions::new(items.len(), 80)
            .with_viewport_height(320)
            .with_overscan(2)
            .with_virtualize_threshold(50),
    );
    println!("total_height={}", w.total_height());
    println!("visible_range={:?}", w.visible_range());

    let mut s = SelectionMachine::new();
    s.open();
    for _ in 0..6 {
        s.on_key(NavKey::ArrowDown, &items);
    }
    if let Some(i) = s.highlighted_index() {
        w.scroll_to_index(i, Align::Auto);
    }
    println!(
        "highlighted={:?} offset={} range={:?}",
        s.highlighted_index(),
        w.scroll_offset(),
        w.visible_range()
    );

    w.for_each_row(|row| {
        let marker = if s.highlighted_index() == Some(row.index) {
            ">"
        } else {
            " "
        };
        println!("{marker} {:>6} top={} {}", row.index, row.top, items[row.index].label());
    });

    let t = s.on_key(NavKey::Enter, &items);
    println!("enter -> {t:?}");
    println!("selected={:?} open={}", s.selected_id(), s.is_open());
}
