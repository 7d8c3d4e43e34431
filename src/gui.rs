//! The desktop window.
//!
//! A single `eframe` window collects the content and the three parameters, runs the
//! [`Pipeline`] and offers preview and export of the result. Generation never blocks
//! the UI thread: each click spawns one background thread that drives the pipeline on
//! the shared tokio runtime and sends the outcome back over an `mpsc` channel, which
//! [`ScribeApp::poll_generation`] drains on the next frame.
//!
//! Every problem reaches the user as a modal dialog with the generic text from
//! [`ScribeError::user_message`]; the detail has already been logged.

use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::{App, NativeOptions, egui};
use tokio::runtime::Runtime;
use tracing::{error, info};

use crate::document::ReportDocument;
use crate::error::ScribeError;
use crate::export::{ExportFormat, save_document};
use crate::params::{Approach, Category, Purpose, RequestParams};
use crate::pipeline::{Generation, Pipeline};

pub const WINDOW_TITLE: &str = "Professional Technical Writing Assistant";

/// A modal informational dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub text: String,
}

impl Notice {
    fn new(title: &str, text: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            text: text.into(),
        }
    }

    fn error(err: &ScribeError) -> Self {
        Self::new("Error", err.user_message())
    }
}

/// State of the open save dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDialog {
    pub path: String,
    pub format: ExportFormat,
}

impl Default for SaveDialog {
    fn default() -> Self {
        Self {
            path: "document.docx".to_string(),
            format: ExportFormat::Docx,
        }
    }
}

pub struct ScribeApp {
    pipeline: Arc<Pipeline>,
    runtime: Arc<Runtime>,

    approach: Approach,
    purpose: Purpose,
    category: Category,
    content: String,

    document: Option<ReportDocument>,
    pending: Option<Receiver<Result<Generation, ScribeError>>>,

    show_preview: bool,
    save_dialog: Option<SaveDialog>,
    notice: Option<Notice>,
}

impl ScribeApp {
    pub fn new(pipeline: Arc<Pipeline>, runtime: Arc<Runtime>) -> Self {
        Self {
            pipeline,
            runtime,
            approach: Approach::default(),
            purpose: Purpose::default(),
            category: Category::default(),
            content: String::new(),
            document: None,
            pending: None,
            show_preview: false,
            save_dialog: None,
            notice: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn document(&self) -> Option<&ReportDocument> {
        self.document.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Clear content and document and reset the dropdowns.
    pub fn new_document(&mut self) {
        self.content.clear();
        self.document = None;
        self.approach = Approach::default();
        self.purpose = Purpose::default();
        self.category = Category::default();
        self.show_preview = false;
        info!("Started a new document");
    }

    /// Validate the content and start a background generation.
    pub fn start_generation(&mut self, ctx: &egui::Context) {
        if self.is_busy() {
            return;
        }
        if let Err(e) = self.pipeline.validate_content(&self.content) {
            self.notice = Some(Notice::new("Input Error", e.user_message()));
            return;
        }

        let params = RequestParams::new(
            self.content.clone(),
            self.approach,
            self.purpose,
            self.category,
        );
        let (tx, rx) = mpsc::channel();
        let pipeline = Arc::clone(&self.pipeline);
        let runtime = Arc::clone(&self.runtime);
        let ctx = ctx.clone();

        let spawned = thread::Builder::new()
            .name("generation".to_string())
            .spawn(move || {
                let result = runtime.block_on(pipeline.generate(&params));
                // The window may be gone already.
                let _ = tx.send(result);
                ctx.request_repaint();
            });

        match spawned {
            Ok(_) => {
                info!("Generation started");
                self.pending = Some(rx);
            }
            Err(e) => {
                error!("Failed to start generation thread: {}", e);
                self.notice = Some(Notice::error(&ScribeError::Io(e)));
            }
        }
    }

    /// Apply a finished generation, if any.
    pub fn poll_generation(&mut self) {
        let Some(rx) = &self.pending else {
            return;
        };

        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(ScribeError::Document(
                "generation thread ended without a result".to_string(),
            )),
        };
        self.pending = None;

        match outcome {
            Ok(generation) => {
                self.document = Some(generation.document);
                self.notice = Some(Notice::new("Success", "Document generated successfully!"));
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                self.notice = Some(Notice::error(&e));
            }
        }
    }

    pub fn open_preview(&mut self) {
        if self.document.is_some() {
            self.show_preview = true;
        } else {
            self.notice = Some(Notice::new(
                "No Document",
                "No document to preview. Please generate a document first.",
            ));
        }
    }

    pub fn open_save_dialog(&mut self) {
        if self.document.is_some() {
            self.save_dialog = Some(SaveDialog::default());
        } else {
            self.notice = Some(Notice::new(
                "No Document",
                "No document to save. Please generate a document first.",
            ));
        }
    }

    /// Export the current document to `path`.
    pub fn save_to(&mut self, path: &Path) {
        let Some(document) = &self.document else {
            return;
        };
        match save_document(document, path, &self.pipeline.config().converter) {
            Ok(saved) => {
                self.notice = Some(Notice::new(
                    "Success",
                    format!("Document saved successfully to {}", saved.display()),
                ));
            }
            Err(e) => {
                error!("Error saving document: {}", e);
                self.notice = Some(Notice::error(&e));
            }
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New Document").clicked() {
                        self.new_document();
                        ui.close_menu();
                    }
                    if ui.button("Save").clicked() {
                        self.open_save_dialog();
                        ui.close_menu();
                    }
                    if ui.button("Download").clicked() {
                        self.open_save_dialog();
                        ui.close_menu();
                    }
                    if ui.button("Preview").clicked() {
                        self.open_preview();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Help", |ui| {
                    if ui.button("About").clicked() {
                        self.notice = Some(Notice::new(
                            "About",
                            format!(
                                "{} v{}\n\nDrafts technical documents with an AI model and exports them as DOCX or PDF.",
                                WINDOW_TITLE,
                                env!("CARGO_PKG_VERSION")
                            ),
                        ));
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn form(&mut self, ctx: &egui::Context, enabled: bool) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.set_enabled(enabled);
            ui.heading(WINDOW_TITLE);
            ui.add_space(8.0);

            egui::Grid::new("parameters").num_columns(2).show(ui, |ui| {
                ui.label("Approach:");
                egui::ComboBox::from_id_source("approach")
                    .selected_text(self.approach.label())
                    .show_ui(ui, |ui| {
                        for option in Approach::ALL {
                            ui.selectable_value(&mut self.approach, *option, option.label());
                        }
                    });
                ui.end_row();

                ui.label("Purpose:");
                egui::ComboBox::from_id_source("purpose")
                    .selected_text(self.purpose.label())
                    .show_ui(ui, |ui| {
                        for option in Purpose::ALL {
                            ui.selectable_value(&mut self.purpose, *option, option.label());
                        }
                    });
                ui.end_row();

                ui.label("Category:");
                egui::ComboBox::from_id_source("category")
                    .selected_text(self.category.label())
                    .show_ui(ui, |ui| {
                        for option in Category::ALL {
                            ui.selectable_value(&mut self.category, *option, option.label());
                        }
                    });
                ui.end_row();
            });

            ui.add_space(8.0);
            ui.label("Content:");
            egui::ScrollArea::vertical()
                .id_source("content_scroll")
                .max_height(ui.available_height() - 48.0)
                .show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut self.content)
                            .desired_rows(20)
                            .desired_width(f32::INFINITY),
                    );
                });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let busy = self.is_busy();
                if ui.add_enabled(!busy, egui::Button::new("Generate")).clicked() {
                    self.start_generation(ctx);
                }
                if ui.button("Preview").clicked() {
                    self.open_preview();
                }
                if ui.button("Download").clicked() {
                    self.open_save_dialog();
                }
                if busy {
                    ui.add(egui::Spinner::new());
                    ui.label("Generating...");
                }
            });
        });
    }

    fn preview_window(&mut self, ctx: &egui::Context) {
        let Some(document) = &self.document else {
            self.show_preview = false;
            return;
        };
        let mut text = document.plain_text();
        egui::Window::new("Document Preview")
            .open(&mut self.show_preview)
            .default_size([640.0, 520.0])
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut text)
                            .interactive(false)
                            .desired_width(f32::INFINITY),
                    );
                });
            });
    }

    fn save_window(&mut self, ctx: &egui::Context) {
        let Some(dialog) = &mut self.save_dialog else {
            return;
        };

        let mut save = false;
        let mut cancel = false;
        egui::Window::new("Save Document")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("File:");
                    ui.text_edit_singleline(&mut dialog.path);
                });
                ui.horizontal(|ui| {
                    ui.label("Format:");
                    for format in ExportFormat::ALL {
                        if ui.radio_value(&mut dialog.format, format, format.label()).changed() {
                            dialog.path = format
                                .apply_to(Path::new(&dialog.path))
                                .display()
                                .to_string();
                        }
                    }
                });
                ui.horizontal(|ui| {
                    save = ui.button("Save").clicked();
                    cancel = ui.button("Cancel").clicked();
                });
            });

        if save {
            let path = dialog.path.clone();
            self.save_dialog = None;
            self.save_to(Path::new(&path));
        } else if cancel {
            self.save_dialog = None;
        }
    }

    fn notice_window(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.notice else {
            return;
        };

        let mut dismissed = false;
        egui::Window::new(notice.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(notice.text.as_str());
                ui.add_space(8.0);
                dismissed = ui.button("OK").clicked();
            });

        if dismissed {
            self.notice = None;
        }
    }
}

impl App for ScribeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_generation();

        self.menu_bar(ctx);
        // Dialogs are modal: the form stays visible but inert while one is open.
        let modal = self.notice.is_some() || self.save_dialog.is_some();
        self.form(ctx, !modal);

        if self.show_preview {
            self.preview_window(ctx);
        }
        self.save_window(ctx);
        self.notice_window(ctx);
    }
}

/// Open the window and block until it is closed.
pub fn run(pipeline: Arc<Pipeline>, runtime: Arc<Runtime>) -> Result<(), eframe::Error> {
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([900.0, 760.0])
            .with_min_inner_size([640.0, 520.0]),
        ..Default::default()
    };
    info!("Opening window");
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| Box::new(ScribeApp::new(pipeline, runtime))),
    )
}
