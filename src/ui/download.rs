use super::{
    ActiveTheme, AnyElement, AppView, Context, DownloadMessage, DownloadState, IntoElement,
    ParentElement, Sender, Styled, StyledExt, Tag, div, h_flex, thread, v_flex,
};
use crate::model_download::{ModelDownloadEvent, ModelKind, ensure_model_ready, model_path};

impl AppView {
    pub(super) fn poll_download_events(&mut self, state: &mut DownloadState) {
        while let Ok(msg) = self.download_rx.try_recv() {
            apply_download_message(state, msg);
        }
    }

    pub(super) fn render_download_view(
        &self,
        state: &DownloadState,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let bar = progress_bar_string(state.downloaded, state.total);
        let detail = match (state.total, state.finished) {
            (_, true) => "Done".to_string(),
            (Some(total), false) if total > 0 => {
                let percent = (state.downloaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
                format!("{percent:.1}%")
            }
            _ => format!("Downloaded {} KB", state.downloaded / 1024),
        };

        let (status_icon, status_text, status_color) = if state.finished && state.error.is_none() {
            ("✓", "Models ready", theme.success)
        } else if state.error.is_some() {
            ("✗", "Download failed", theme.accent)
        } else {
            ("⟳", "Downloading models", theme.foreground)
        };

        let progress_label = format!(
            "{}/{} models ready",
            state.ready_models,
            ModelKind::ALL.len()
        );

        let mut container = v_flex()
            .gap_3()
            .p_6()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.group_box)
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .text_color(status_color)
                            .font_semibold()
                            .child(format!("{} {}", status_icon, status_text)),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child(progress_label),
                    ),
            )
            .child(
                div()
                    .px_3()
                    .py_2()
                    .rounded_md()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.muted)
                    .font_family(theme.mono_font_family.clone())
                    .text_color(theme.foreground)
                    .child(bar),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(theme.muted_foreground)
                    .child(detail),
            )
            .child(
                div()
                    .text_color(theme.foreground)
                    .child(state.message.clone()),
            );

        if let Some(err) = &state.error {
            container = container.child(Tag::danger().rounded_full().child(format!("Error: {err}")));
        }

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(container)
            .into_any_element()
    }
}

/// Folds one download-thread message into the screen state. A failed model
/// is recorded but never blocks `finished`: the model's feature is simply
/// unavailable once the main screen comes up.
fn apply_download_message(state: &mut DownloadState, msg: DownloadMessage) {
    match msg {
        DownloadMessage::Event(ModelDownloadEvent::AlreadyPresent { model }) => {
            state.message = format!("{} already present", model.label());
        }
        DownloadMessage::Event(ModelDownloadEvent::Started { model, total }) => {
            state.downloaded = 0;
            state.total = total;
            state.message = format!("Downloading {} model...", model.label());
        }
        DownloadMessage::Event(ModelDownloadEvent::Progress {
            downloaded, total, ..
        }) => {
            state.downloaded = downloaded;
            state.total = total;
        }
        DownloadMessage::Event(ModelDownloadEvent::Finished { model }) => {
            state.ready_models += 1;
            state.message = format!("{} model ready", model.label());
        }
        DownloadMessage::AllReady => {
            state.finished = true;
            state.message = if state.error.is_some() {
                "Starting app, some models are unavailable...".to_string()
            } else {
                "All models ready, starting app...".to_string()
            };
        }
        DownloadMessage::Error(err) => {
            state.error = Some(err);
            state.message = "Model download failed".to_string();
        }
    }
}

pub(super) fn spawn_model_downloads(
    model_dir: String,
    tx: Sender<DownloadMessage>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for kind in ModelKind::ALL {
            let path = model_path(kind, &model_dir);
            let result = ensure_model_ready(kind, &path, |event| {
                let _ = tx.send(DownloadMessage::Event(event));
            });

            if let Err(err) = result {
                log::error!("failed to download {} model: {err:?}", kind.label());
                let _ = tx.send(DownloadMessage::Error(format!("{}: {err:#}", kind.label())));
            }
        }
        let _ = tx.send(DownloadMessage::AllReady);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_model_does_not_block_startup() {
        let mut state = DownloadState::new();
        apply_download_message(
            &mut state,
            DownloadMessage::Error("speech recognizer: connection refused".to_string()),
        );
        assert!(!state.finished);

        apply_download_message(&mut state, DownloadMessage::AllReady);
        assert!(state.finished);
        assert!(state.error.is_some());
    }

    #[test]
    fn ready_models_are_counted() {
        let mut state = DownloadState::new();
        for kind in ModelKind::ALL {
            apply_download_message(
                &mut state,
                DownloadMessage::Event(ModelDownloadEvent::Finished { model: kind }),
            );
        }
        assert_eq!(state.ready_models, ModelKind::ALL.len());
    }

    #[test]
    fn progress_bar_is_full_at_completion() {
        assert!(progress_bar_string(100, Some(100)).contains("100.0%"));
    }
}

fn progress_bar_string(downloaded: u64, total: Option<u64>) -> String {
    const BAR_LEN: usize = 30;
    match total {
        Some(total) if total > 0 => {
            let pct = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
            let filled = ((pct * BAR_LEN as f64).round() as usize).min(BAR_LEN);
            let empty = BAR_LEN.saturating_sub(filled);
            format!(
                "[{}{}] {:>5.1}%",
                "=".repeat(filled),
                " ".repeat(empty),
                pct * 100.0
            )
        }
        _ => {
            let spinner_width = ((downloaded / 64) as usize % (BAR_LEN.max(1))) + 1;
            format!(
                "[{:-<width$}] unknown size",
                ">",
                width = spinner_width.min(BAR_LEN)
            )
        }
    }
}
