//! User-facing prompt texts and keyboards

use crate::calendar::{DateGrid, TimeGrid};
use crate::finalize::{FinalizeReport, SinkOutcome};
use crate::state_machine::ComposeContext;
use crate::ui::{Action, Button, Keyboard, Prompt};
use chrono::{NaiveDate, NaiveTime};

/// Example shown whenever a manual date is rejected
pub const DATE_EXAMPLE: &str = "17.05.2025";
pub const TIME_EXAMPLE: &str = "14:30";
pub const EMPTY_PLATFORMS_NOTICE: &str = "⚠️ Выберите хотя бы одну платформу.";

fn cancel_row() -> Vec<Button> {
    vec![Button::new("✖️ Отмена", Action::Cancel)]
}

fn new_post_keyboard() -> Keyboard {
    Keyboard::new().button("🆕 Новый пост", Action::NewPost)
}

pub fn content() -> Prompt {
    Prompt::new(
        "📝 Отправьте текст поста, фото или видео (можно с подписью) или нажмите «Пропустить»",
        Keyboard::new()
            .button("⏭ Пропустить", Action::SkipContent)
            .row(cancel_row()),
    )
}

pub fn date(context: &ComposeContext, today: NaiveDate) -> Prompt {
    let grid = DateGrid::generate(context.calendar, today, today);
    Prompt::new(
        format!(
            "⏰ {}\nВыберите дату публикации, нажмите «Опубликовать сейчас» или введите дату (ДД.ММ.ГГГГ)",
            grid.caption
        ),
        grid.keyboard(),
    )
}

pub fn manual_entry() -> Prompt {
    Prompt::new(
        format!("⌨️ Введите дату в формате ДД.ММ.ГГГГ или ДД.ММ.ГГГГ ЧЧ:ММ. Пример: {DATE_EXAMPLE}"),
        Keyboard::new().row(cancel_row()),
    )
}

pub fn date_error() -> Prompt {
    Prompt::new(
        format!("❌ Неверный формат. Пример: {DATE_EXAMPLE}"),
        Keyboard::new().row(cancel_row()),
    )
}

pub fn date_in_past(today: NaiveDate) -> Prompt {
    Prompt::new(
        format!(
            "❌ Эта дата уже прошла. Укажите дату не раньше {}",
            today.format("%d.%m.%Y")
        ),
        Keyboard::new().row(cancel_row()),
    )
}

pub fn time(date: Option<NaiveDate>, selected: Option<NaiveTime>) -> Prompt {
    let mut text = String::from("🕒 ");
    if let Some(date) = date {
        text.push_str(&format!("Дата: {}. ", date.format("%d.%m.%Y")));
    }
    text.push_str("Выберите час и минуты (или введите ЧЧ:ММ), затем нажмите «Готово»");
    if let Some(selected) = selected {
        text.push_str(&format!("\nВыбрано: {}", selected.format("%H:%M")));
    }
    Prompt::new(text, TimeGrid::new(selected).keyboard())
}

pub fn time_error() -> Prompt {
    Prompt::new(
        format!("❌ Неверный формат времени. Пример: {TIME_EXAMPLE}"),
        Keyboard::new().row(cancel_row()),
    )
}

pub fn cancelled() -> Prompt {
    Prompt::new("🚫 Создание поста отменено.", new_post_keyboard())
}

/// One message per sink that was attempted, or a notice that none was
pub fn finalize_report(report: &FinalizeReport) -> Vec<String> {
    let mut messages = Vec::new();
    match &report.store {
        SinkOutcome::Skipped => {}
        SinkOutcome::Delivered => messages.push("✅ Пост добавлен в Airtable!".to_string()),
        SinkOutcome::Failed(reason) => messages.push(format!("❌ Ошибка: {reason}")),
    }
    match &report.broadcast {
        SinkOutcome::Skipped => {}
        SinkOutcome::Delivered => messages.push("📢 Пост опубликован в канале.".to_string()),
        SinkOutcome::Failed(reason) => {
            messages.push(format!("⚠️ Ошибка при публикации в канал: {reason}"));
        }
    }
    if messages.is_empty() {
        messages.push("ℹ️ Пост никуда не отправлен: хранилище не настроено, публикация в канал не выбрана.".to_string());
    }
    messages
}

pub fn finished() -> Prompt {
    Prompt::new(
        "🟢 Нажмите «Новый пост» или /start, чтобы создать новый пост.",
        new_post_keyboard(),
    )
}
