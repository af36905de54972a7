use super::render_util::frame_to_image;
use super::{
    ActiveTheme, AnyElement, AppView, Button, ButtonVariants, CAMERA_MAX_HEIGHT,
    CAMERA_MIN_HEIGHT, Context, DEFAULT_CAMERA_RATIO, IntoElement, ObjectFit, PANEL_WIDTH,
    ParentElement, SharedString, Styled, StyledImage, TRANSCRIPT_PLACEHOLDER,
    TRANSLATION_PLACEHOLDER, Window, div, h_flex, img, px, v_flex,
};
use crate::speech::RecognitionEvent;
use gpui_component::StyledExt;
use crate::types::Gesture;
use std::{sync::Arc, time::Duration};

// Skeletons older than this are not drawn over newer frames.
const OVERLAY_MAX_AGE: Duration = Duration::from_secs(1);

/// Word shown in the translation card, driven by detection results.
///
/// The word tracks the current gesture and hides as soon as detection stops
/// reporting one. The speech gate outlives the word so a sign that flickers
/// in and out of view is not re-spoken every time it reappears.
#[derive(Default)]
pub(super) struct WordDisplay {
    word: Option<Gesture>,
    last_spoken: Option<Gesture>,
}

impl WordDisplay {
    /// Apply one detection result; returns the word to speak, if any.
    pub(super) fn apply(&mut self, detected: Option<Gesture>) -> Option<&'static str> {
        self.word = detected;
        match detected {
            Some(gesture) if self.last_spoken != Some(gesture) => {
                self.last_spoken = Some(gesture);
                Some(gesture.word())
            }
            _ => None,
        }
    }

    pub(super) fn clear(&mut self) {
        self.word = None;
        self.last_spoken = None;
    }

    pub(super) fn text(&self) -> Option<&'static str> {
        self.word.map(|gesture| gesture.word())
    }
}

fn apply_recognition_event(
    transcript: &mut String,
    error: &mut Option<String>,
    event: RecognitionEvent,
) {
    match event {
        RecognitionEvent::Transcript(text) => {
            *transcript = text;
            *error = None;
        }
        RecognitionEvent::Failed(message) => {
            *error = Some(message);
        }
    }
}

impl AppView {
    pub(super) fn render_main(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        self.drain_recognition_events();
        self.drain_detection_results();
        self.drain_camera_frames(window, cx);

        let theme = cx.theme();

        let confidence_text = self
            .latest_result
            .as_ref()
            .map(|r| format!("{:.0}%", r.confidence * 100.0))
            .unwrap_or_else(|| "--".to_string());

        let gesture_text = self
            .latest_result
            .as_ref()
            .and_then(|r| r.gesture)
            .map(|g| g.name().to_string())
            .unwrap_or_else(|| "-".to_string());

        let ratio = self.camera_aspect_ratio();
        let camera_height = (PANEL_WIDTH / ratio).clamp(CAMERA_MIN_HEIGHT, CAMERA_MAX_HEIGHT);

        let frame_view: AnyElement = if let Some(image) = &self.latest_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .rounded_t_lg()
                .into_any_element()
        } else {
            let placeholder = if self.camera_stream.is_some() {
                "في انتظار الكاميرا..."
            } else {
                "الكاميرا متوقفة"
            };
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .rounded_t_lg()
                .child(placeholder)
                .into_any_element()
        };

        let camera_shell = div()
            .w(px(PANEL_WIDTH))
            .h(px(camera_height))
            .overflow_hidden()
            .rounded_t_lg()
            .bg(gpui::rgb(0x000000))
            .child(frame_view);

        let status_row = h_flex()
            .justify_between()
            .items_center()
            .gap_2()
            .child(
                div()
                    .text_xs()
                    .text_color(gpui::rgb(0xa0aab8))
                    .child(format!("الإشارة: {gesture_text}")),
            )
            .child(
                div()
                    .text_xs()
                    .text_color(gpui::rgb(0xa0aab8))
                    .child(format!("الدقة: {confidence_text}")),
            );

        let camera_toggle_label = if self.camera_stream.is_some() {
            "⏹ إيقاف الكاميرا"
        } else {
            "▶ تشغيل الكاميرا"
        };

        let listen_label = if self.recognition_session.is_some() {
            "⏹ إيقاف الاستماع"
        } else {
            "🎤 تحدث"
        };

        let controls = h_flex()
            .gap_2()
            .flex_wrap()
            .child(
                Button::new(SharedString::from("speak"))
                    .primary()
                    .label("🔊 نطق")
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.speak_translation();
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("copy"))
                    .outline()
                    .label("📋 نسخ")
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.copy_translation(cx);
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("clear"))
                    .outline()
                    .label("🗑 مسح")
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.clear_translation();
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("camera-toggle"))
                    .outline()
                    .label(camera_toggle_label)
                    .on_click(cx.listener(|this, _, _, cx| {
                        if this.camera_stream.is_some() {
                            this.stop_camera();
                        } else {
                            this.start_camera_if_needed();
                        }
                        cx.notify();
                    })),
            )
            .child(
                Button::new(SharedString::from("listen"))
                    .outline()
                    .label(listen_label)
                    .on_click(cx.listener(|this, _, _, cx| {
                        this.toggle_recognition();
                        cx.notify();
                    })),
            );

        let translation_display: AnyElement = match self.word_display.text() {
            Some(word) => div()
                .text_2xl()
                .font_semibold()
                .text_color(theme.foreground)
                .child(word)
                .into_any_element(),
            None => div()
                .text_lg()
                .text_color(theme.muted_foreground)
                .child(TRANSLATION_PLACEHOLDER)
                .into_any_element(),
        };

        let translation_card = v_flex()
            .gap_2()
            .p_4()
            .rounded_lg()
            .bg(gpui::rgb(0x0f1419))
            .min_h(px(96.0))
            .items_center()
            .justify_center()
            .child(translation_display);

        let transcript_display: AnyElement = if self.transcript_text.is_empty() {
            div()
                .text_sm()
                .text_color(theme.muted_foreground)
                .child(TRANSCRIPT_PLACEHOLDER)
                .into_any_element()
        } else {
            div()
                .text_lg()
                .text_color(theme.foreground)
                .child(self.transcript_text.clone())
                .into_any_element()
        };

        let transcript_card = v_flex()
            .gap_2()
            .p_3()
            .rounded_lg()
            .bg(gpui::rgb(0x0f1419))
            .min_h(px(56.0))
            .items_center()
            .justify_center()
            .child(transcript_display);

        let mut notices = v_flex().gap_2();
        if let Some(err) = &self.camera_error {
            notices = notices.child(inline_error(format!("خطأ في الكاميرا: {err}")));
        }
        if let Some(err) = &self.speech_error {
            notices = notices.child(inline_error(format!("النطق غير متاح: {err}")));
        }
        if let Some(err) = &self.recognition_error {
            notices = notices.child(inline_error(format!("تعذر التعرف على الصوت: {err}")));
        }
        // The worker only exits early when its models failed to load.
        if self
            .detector_handle
            .as_ref()
            .is_some_and(|handle| handle.is_finished())
        {
            notices = notices.child(inline_error(
                "توقف محرك التعرف على الإشارات، راجع السجل".to_string(),
            ));
        }
        if self.recognition_session.is_some() {
            notices = notices.child(
                div()
                    .text_xs()
                    .text_color(theme.success)
                    .child("جارٍ الاستماع..."),
            );
        }

        let camera_card = v_flex()
            .w(px(PANEL_WIDTH))
            .rounded_lg()
            .overflow_hidden()
            .bg(gpui::rgb(0x0f1419))
            .child(camera_shell)
            .child(v_flex().gap_2().p_3().child(status_row));

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x1a2332))
            .items_center()
            .justify_center()
            .child(
                v_flex()
                    .gap_3()
                    .p_4()
                    .child(camera_card)
                    .child(translation_card)
                    .child(controls)
                    .child(transcript_card)
                    .child(notices),
            )
            .into_any_element()
    }

    fn drain_recognition_events(&mut self) {
        let mut session_done = false;
        while let Ok(event) = self.recognition_rx.try_recv() {
            session_done = true;
            apply_recognition_event(&mut self.transcript_text, &mut self.recognition_error, event);
        }
        if session_done {
            self.recognition_session = None;
        }
    }

    fn drain_detection_results(&mut self) {
        while let Ok(result) = self.result_rx.try_recv() {
            if let Some(word) = self.word_display.apply(result.gesture) {
                if let Some(speaker) = &self.speaker {
                    if let Err(err) = speaker.say(word) {
                        log::warn!("failed to queue speech: {err}");
                    }
                }
            }
            self.latest_result = Some(result);
        }
    }

    fn drain_camera_frames(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let mut frames = Vec::new();
        while let Ok(frame) = self.frame_rx.try_recv() {
            frames.push(frame);
        }

        for frame in frames {
            let overlay = self
                .latest_result
                .as_ref()
                .filter(|r| frame.timestamp.saturating_duration_since(r.timestamp) < OVERLAY_MAX_AGE)
                .and_then(|r| r.landmarks.as_deref());

            if let Some(image) = frame_to_image(&frame, overlay) {
                self.replace_latest_image(image, window, cx);
            }
            self.latest_frame = Some(frame);
        }
    }

    fn camera_aspect_ratio(&self) -> f32 {
        if let Some(frame) = &self.latest_frame {
            if frame.height > 0 {
                return frame.width as f32 / frame.height as f32;
            }
        }
        DEFAULT_CAMERA_RATIO
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<super::RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // Explicitly drop the previous GPU texture; otherwise the sprite atlas keeps
            // every frame and memory will climb rapidly while the camera is running.
            cx.drop_image(old_image, Some(window));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_hides_when_gesture_stops() {
        let mut display = WordDisplay::default();
        assert_eq!(display.apply(Some(Gesture::Hello)), Some("مرحباً"));
        assert_eq!(display.text(), Some("مرحباً"));

        assert_eq!(display.apply(None), None);
        assert_eq!(display.text(), None);
    }

    #[test]
    fn reappearing_gesture_is_shown_but_not_respoken() {
        let mut display = WordDisplay::default();
        assert!(display.apply(Some(Gesture::Hello)).is_some());
        display.apply(None);

        assert_eq!(display.apply(Some(Gesture::Hello)), None);
        assert_eq!(display.text(), Some("مرحباً"));
    }

    #[test]
    fn new_gesture_is_spoken() {
        let mut display = WordDisplay::default();
        assert_eq!(display.apply(Some(Gesture::Yes)), Some("نعم"));
        assert_eq!(display.apply(Some(Gesture::No)), Some("لا"));
    }

    #[test]
    fn clear_resets_word_and_speech_gate() {
        let mut display = WordDisplay::default();
        display.apply(Some(Gesture::Thanks));
        display.clear();

        assert_eq!(display.text(), None);
        assert_eq!(display.apply(Some(Gesture::Thanks)), Some("شكراً"));
    }

    #[test]
    fn transcript_does_not_touch_word_display() {
        let mut display = WordDisplay::default();
        display.apply(Some(Gesture::Help));

        let mut transcript = String::new();
        let mut error = None;
        apply_recognition_event(
            &mut transcript,
            &mut error,
            RecognitionEvent::Transcript("أين المستشفى".to_string()),
        );

        assert_eq!(transcript, "أين المستشفى");
        assert_eq!(display.text(), Some("مساعدة"));
        assert!(error.is_none());
    }

    #[test]
    fn failed_recognition_keeps_previous_transcript() {
        let mut transcript = "مرحباً".to_string();
        let mut error = None;
        apply_recognition_event(
            &mut transcript,
            &mut error,
            RecognitionEvent::Failed("no input device".to_string()),
        );

        assert_eq!(transcript, "مرحباً");
        assert_eq!(error.as_deref(), Some("no input device"));
    }
}

fn inline_error(message: String) -> AnyElement {
    h_flex()
        .gap_2()
        .items_center()
        .p_3()
        .rounded_lg()
        .bg(gpui::rgba(0xef444433))
        .border_1()
        .border_color(gpui::rgba(0xef4444ff))
        .child(div().text_base().child("⚠️"))
        .child(
            div()
                .text_xs()
                .text_color(gpui::rgb(0xfca5a5))
                .child(message),
        )
        .into_any_element()
}
