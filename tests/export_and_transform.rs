//! Export isolation and transform interplay against a fake backend.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use folioview::test_utils::{pump_for, pump_until, FakeBackend};
use folioview::{
    DocumentViewer, ExportKind, Extent, PageSize, PageSlot, ViewerConfig, ViewerEvent,
};

const TIMEOUT: Duration = Duration::from_secs(5);
const PAGE: PageSize = PageSize::new(600.0, 800.0);

fn test_config() -> ViewerConfig {
    ViewerConfig {
        workers: 1,
        scroll_throttle_ms: 0,
        resize_debounce_ms: 0,
        page_gap: 0.0,
        ..ViewerConfig::default()
    }
}

fn open_viewer(pages: usize, viewport: Extent) -> (Arc<FakeBackend>, DocumentViewer) {
    let backend = FakeBackend::new();
    backend.add_document("doc", pages, PAGE, 1);
    let mut viewer = DocumentViewer::new(backend.clone(), test_config());
    viewer.handle_resize(viewport, Instant::now());
    let _ = viewer.tick(Instant::now());
    viewer.open("doc");
    pump_until(&mut viewer, TIMEOUT, |e| {
        matches!(e, ViewerEvent::TotalPages(_))
    });
    (backend, viewer)
}

#[test]
fn download_exports_every_page_at_native_scale() {
    let (_backend, mut viewer) = open_viewer(3, Extent::new(600.0, 800.0));
    viewer.set_zoom_percent(200.0);

    viewer.request_download();
    let mut exported = HashSet::new();
    pump_until(&mut viewer, TIMEOUT, |e| {
        if let ViewerEvent::ExportReady { kind, page, bitmap } = e {
            assert_eq!(*kind, ExportKind::Download);
            assert_eq!(
                bitmap.width, 600,
                "exports are document-native, independent of on-screen scale"
            );
            exported.insert(*page);
        }
        exported.len() == 3
    });
}

#[test]
fn export_does_not_replace_on_screen_bitmaps() {
    let (_backend, mut viewer) = open_viewer(3, Extent::new(600.0, 800.0));
    viewer.set_zoom_percent(200.0);
    pump_until(&mut viewer, TIMEOUT, |e| {
        matches!(e, ViewerEvent::PageRendered(1))
    });

    viewer.request_print();
    let mut exported = HashSet::new();
    pump_until(&mut viewer, TIMEOUT, |e| {
        if let ViewerEvent::ExportReady { kind, page, .. } = e {
            assert_eq!(*kind, ExportKind::Print);
            exported.insert(*page);
        }
        exported.len() == 3
    });

    // The on-screen slot still holds the 200% render, not the export.
    let PageSlot::Bitmap(on_screen) = viewer.layout()[0].clone() else {
        panic!("page 1 should still be rendered");
    };
    assert_eq!(on_screen.width, 1200);
    assert!(viewer.is_page_cached(1));
}

#[test]
fn fit_to_width_tracks_container_resizes() {
    let (_backend, mut viewer) = open_viewer(5, Extent::new(600.0, 800.0));

    viewer.fit_to_width();
    assert_eq!(viewer.transform().scale, 1.0);

    viewer.handle_resize(Extent::new(1200.0, 800.0), Instant::now());
    let _ = viewer.tick(Instant::now());
    assert_eq!(viewer.transform().scale, 2.0);
    assert!(!viewer.is_page_cached(1));
}

#[test]
fn fit_to_height_accounts_for_rotation() {
    let (_backend, mut viewer) = open_viewer(5, Extent::new(1200.0, 1200.0));

    viewer.fit_to_height();
    assert_eq!(viewer.transform().scale, 1.5);

    // Sideways, the vertical extent is the native width (600).
    viewer.rotate_right();
    assert_eq!(viewer.transform().scale, 2.0);
}

#[test]
fn toggle_fit_mode_cycles_through_policies() {
    let (_backend, mut viewer) = open_viewer(5, Extent::new(600.0, 800.0));
    assert_eq!(viewer.transform().scale, 1.0);

    viewer.toggle_fit_mode(); // -> fit width
    viewer.handle_resize(Extent::new(900.0, 800.0), Instant::now());
    let _ = viewer.tick(Instant::now());
    assert_eq!(viewer.transform().scale, 1.5);

    viewer.toggle_fit_mode(); // -> fit height
    assert_eq!(viewer.transform().scale, 1.0);
}

#[test]
fn explicit_zoom_breaks_out_of_fit_mode() {
    let (_backend, mut viewer) = open_viewer(5, Extent::new(900.0, 800.0));
    viewer.fit_to_width();
    assert_eq!(viewer.transform().scale, 1.5);

    viewer.zoom_in();
    let zoomed = viewer.transform().scale;
    assert!(zoomed > 1.5);

    // A later resize no longer re-derives the scale.
    viewer.handle_resize(Extent::new(600.0, 800.0), Instant::now());
    let _ = viewer.tick(Instant::now());
    assert_eq!(viewer.transform().scale, zoomed);
}

#[test]
fn rotation_swaps_rendered_bitmap_axes() {
    let (_backend, mut viewer) = open_viewer(5, Extent::new(800.0, 800.0));
    viewer.rotate_right();
    pump_until(&mut viewer, TIMEOUT, |e| {
        matches!(e, ViewerEvent::PageRendered(1))
    });

    let PageSlot::Bitmap(bitmap) = viewer.layout()[0].clone() else {
        panic!("page 1 should be rendered");
    };
    assert_eq!((bitmap.width, bitmap.height), (800, 600));
}

#[test]
fn zoom_clamps_and_stays_clamped() {
    let (_backend, mut viewer) = open_viewer(3, Extent::new(600.0, 800.0));
    let max = test_config().max_scale;

    for _ in 0..50 {
        viewer.zoom_in();
    }
    assert_eq!(viewer.transform().scale, max);

    for _ in 0..100 {
        viewer.zoom_out();
    }
    assert_eq!(viewer.transform().scale, test_config().min_scale);
}

#[test]
fn scroll_bursts_settle_on_the_latest_offset() {
    let backend = FakeBackend::new();
    backend.add_document("doc", 50, PAGE, 1);
    let config = ViewerConfig {
        workers: 1,
        scroll_throttle_ms: 30,
        resize_debounce_ms: 0,
        page_gap: 0.0,
        ..ViewerConfig::default()
    };
    let mut viewer = DocumentViewer::new(backend.clone(), config);
    viewer.handle_resize(Extent::new(600.0, 800.0), Instant::now());
    let _ = viewer.tick(Instant::now());
    viewer.open("doc");
    pump_until(&mut viewer, TIMEOUT, |e| {
        matches!(e, ViewerEvent::TotalPages(_))
    });

    // A burst of scrolls inside one throttle interval: only the leading
    // edge fires immediately; the trailing edge must use the newest
    // offset, never a queued intermediate one.
    let now = Instant::now();
    viewer.handle_scroll(5.0 * 800.0, now);
    viewer.handle_scroll(10.0 * 800.0, now);
    viewer.handle_scroll(24.0 * 800.0, now);

    let events = pump_for(&mut viewer, Duration::from_millis(80));
    assert_eq!(viewer.scroll_offset(), 24.0 * 800.0);
    assert_eq!(viewer.current_page(), 25);
    assert!(viewer.window().contains(25));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ViewerEvent::PageVisible(25))),
        "settling must announce the page at the latest offset"
    );
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ViewerEvent::PageVisible(11))),
        "intermediate offsets must never be announced"
    );
}
