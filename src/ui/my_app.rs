use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use eframe::egui;
use egui::{Align2, Color32, Margin, Sense, Style, Vec2};
use lru::LruCache;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::directory::MemberDirectory;
use crate::error::{MapError, TileError};
use crate::map::entity::Entity;
use crate::map::facade::Avatar;
use crate::map::map::{paint_avatar, MapView};
use crate::map::map_tile::{Coordinate, MapTile, TileKey};
use crate::map::markers::{ClickOutcome, MarkerLifecycleManager};
use crate::map::viewport::{ViewportController, RESET_KEY, SEARCH_FOCUS_ZOOM};
use crate::maps_api::search::AlgoliaIndex;
use crate::maps_api::search_adapter::{SearchAdapter, SearchOutcome};
use crate::maps_api::tile_retriever::{TileFailures, TileRetriever};

const TILE_CACHE_SIZE: usize = 512;
const HIT_LIST_HEIGHT: f32 = 224.0;
const HIT_LIST_WIDTH: f32 = 250.0;

type TileResult = (TileKey, Result<MapTile, TileError>);

pub struct MyApp {
    tile_cache: LruCache<TileKey, MapTile>,
    tile_retriever: TileRetriever,
    pending_tiles: HashSet<TileKey>,
    failed_tiles: TileFailures,
    receiver: mpsc::UnboundedReceiver<TileResult>,
    sender: mpsc::UnboundedSender<TileResult>,
    search: SearchAdapter,
    directory: MemberDirectory,
    markers: MarkerLifecycleManager<MapView>,
    query: String,
    rendered_revision: Option<u64>,
    // Declared last so in-flight tasks are dropped after everything using them.
    runtime: tokio::runtime::Runtime,
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for outcome in self.search.poll() {
            match outcome {
                SearchOutcome::Directory(result) => self.directory.apply_directory(result),
                SearchOutcome::Query { query, result } => {
                    if let Err(e) = &result {
                        log::warn!("search for {:?} failed: {}", query, e);
                    }
                    self.directory.apply_search(result);
                }
            }
        }

        if ctx.input(|i| i.key_pressed(RESET_KEY)) {
            self.markers.on_key(RESET_KEY);
        }

        while let Ok((key, result)) = self.receiver.try_recv() {
            self.pending_tiles.remove(&key);
            match result {
                Ok(tile) => {
                    self.tile_cache.put(key, tile);
                    self.failed_tiles.clear(&key);
                }
                Err(e) => {
                    let delay = self.failed_tiles.record(key, Instant::now());
                    log::warn!("error fetching tile {:?}: {}, retrying in {:?}", key, e, delay);
                    ctx.request_repaint_after(delay);
                }
            }
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                if self.directory.is_loading() {
                    ui.centered_and_justified(|ui| {
                        ui.spinner();
                    });
                    return;
                }
                if self.directory.load_failed() {
                    let error = self.directory.error().unwrap_or("could not load members");
                    ui.centered_and_justified(|ui| {
                        ui.colored_label(Color32::from_rgb(220, 38, 38), error);
                    });
                    return;
                }
                self.show_map(ui);
            });

        if !self.directory.is_loading() {
            self.show_search(ctx);
            self.show_zoom_controls(ctx);
        }
    }
}

impl MyApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> std::io::Result<Self> {
        cc.egui_ctx.set_style(Self::get_light_theme_style(&cc.egui_ctx));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .thread_name("member-map-io")
            .enable_all()
            .build()?;
        let (sender, receiver) = mpsc::unbounded_channel();

        let index = Arc::new(AlgoliaIndex::from_config(&config));
        let search = SearchAdapter::new(index, runtime.handle().clone()).with_repaint(cc.egui_ctx.clone());
        search.load_all();

        let mut markers = MarkerLifecycleManager::new(ViewportController::new(config.default_zoom));
        markers.attach(MapView::new("member_map", Coordinate::default(), config.default_zoom));

        Ok(Self {
            tile_cache: LruCache::new(NonZeroUsize::new(TILE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
            tile_retriever: TileRetriever::new(config.map_access_token, config.map_style, 512),
            pending_tiles: HashSet::new(),
            failed_tiles: TileFailures::default(),
            receiver,
            sender,
            search,
            directory: MemberDirectory::loading(),
            markers,
            query: String::new(),
            rendered_revision: None,
            runtime,
        })
    }

    fn show_map(&mut self, ui: &mut egui::Ui) {
        let revision = self.directory.revision();
        if self.rendered_revision != Some(revision) {
            self.rendered_revision = Some(revision);
            match self.markers.set_entities(self.directory.members()) {
                Ok(_) => {}
                // Applied once the map reports it has loaded.
                Err(MapError::NotReady) => log::debug!("map not ready, deferring markers"),
                Err(e) => log::warn!("could not place markers: {}", e),
            }
        }

        let size = ui.available_size();
        let Some(map) = self.markers.map_mut() else {
            return;
        };
        let output = map.show(ui, &mut self.tile_cache, size);

        if output.just_loaded {
            if let Err(e) = self.markers.on_map_loaded() {
                log::warn!("could not place markers: {}", e);
            }
            ui.ctx().request_repaint();
        }
        if let Some(marker) = output.clicked {
            if self.markers.handle_click(marker) == ClickOutcome::Ignored {
                log::debug!("click on unmanaged marker {:?}", marker);
            }
        }
        self.request_tiles(ui.ctx(), output.missing_tiles);
    }

    fn request_tiles(&mut self, ctx: &egui::Context, missing_tiles: Vec<TileKey>) {
        let now = Instant::now();
        for key in missing_tiles {
            if self.pending_tiles.contains(&key)
                || self.tile_cache.peek(&key).is_some()
                || !self.failed_tiles.may_retry(&key, now)
            {
                continue;
            }
            let sender = self.sender.clone();
            let tile_retriever = self.tile_retriever.clone();
            let requester = ctx.clone(); // Uses ARC so can be cloned to a new thread cheaply

            self.runtime.spawn(async move {
                let result = tile_retriever.fetch_tile(key).await;
                if sender.send((key, result)).is_ok() {
                    requester.request_repaint();
                }
            });
            self.pending_tiles.insert(key);
        }
    }

    fn show_search(&mut self, ctx: &egui::Context) {
        let mut focus_on: Option<Entity> = None;

        egui::Area::new(egui::Id::new("member_search"))
            .anchor(Align2::LEFT_TOP, [16.0, 20.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_width(HIT_LIST_WIDTH);
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut self.query)
                            .hint_text("Search members...")
                            .desired_width(f32::INFINITY),
                    );
                    if response.changed() {
                        self.search.submit(&self.query);
                    }

                    if let Some(error) = self.directory.error() {
                        ui.colored_label(Color32::from_rgb(220, 38, 38), error);
                    }

                    if self.query.trim().is_empty() {
                        return;
                    }
                    ui.separator();
                    egui::ScrollArea::vertical()
                        .max_height(HIT_LIST_HEIGHT)
                        .show(ui, |ui| {
                            for hit in self.directory.hits() {
                                if hit_row(ui, hit).clicked() {
                                    focus_on = Some(hit.clone());
                                }
                            }
                        });
                });
            });

        if let Some(hit) = focus_on {
            self.markers.focus_entity(&hit, SEARCH_FOCUS_ZOOM);
        }
    }

    fn show_zoom_controls(&mut self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("zoom_controls"))
            .anchor(Align2::RIGHT_BOTTOM, [-24.0, -24.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.vertical(|ui| {
                    let size = Vec2::splat(32.0);
                    if ui.add_sized(size, egui::Button::new("+")).clicked() {
                        self.markers.zoom_in();
                    }
                    if ui.add_sized(size, egui::Button::new("-")).clicked() {
                        self.markers.zoom_out();
                    }
                });
            });
    }

    pub fn get_light_theme_style(ctx: &egui::Context) -> Style {
        use egui::{style::Visuals, FontFamily, FontId, Rounding, Stroke, TextStyle};

        let mut style = (*ctx.style()).clone();

        // Set text styles
        style.text_styles = [
            (TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional)),
            (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
            (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
            (TextStyle::Button, FontId::new(16.0, FontFamily::Proportional)),
            (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
        ]
        .into();

        style.visuals = Visuals::light();
        style.visuals.override_text_color = Some(Color32::BLACK);
        style.visuals.window_rounding = Rounding::same(8.0);
        style.visuals.window_fill = Color32::WHITE;
        style.visuals.window_stroke = Stroke::new(1.0, Color32::from_gray(210));
        style.visuals.window_shadow = egui::Shadow {
            offset: egui::vec2(0.0, 2.0),
            blur: 8.0,
            spread: 0.0,
            color: Color32::from_black_alpha(48),
        };
        style.visuals.popup_shadow = style.visuals.window_shadow;

        style.spacing.window_margin = Margin::same(8.0);
        style.spacing.button_padding = egui::vec2(4.0, 2.0);

        style
    }
}

fn hit_row(ui: &mut egui::Ui, hit: &Entity) -> egui::Response {
    let response = ui
        .horizontal(|ui| {
            let (avatar_rect, _) = ui.allocate_exact_size(Vec2::splat(32.0), Sense::hover());
            paint_avatar(ui.painter(), avatar_rect.center(), 16.0, &Avatar::of(hit));
            ui.vertical(|ui| {
                ui.strong(&hit.display_name);
                if let Some(region) = hit.region_label() {
                    ui.small(region);
                }
            });
        })
        .response;
    ui.interact(response.rect, ui.id().with(("hit", &hit.id)), Sense::click())
        .on_hover_cursor(egui::CursorIcon::PointingHand)
}
