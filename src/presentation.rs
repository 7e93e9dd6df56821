use serde::{Deserialize, Serialize};

use crate::store::{DayDetail, Plan, PlanDetail};

pub const DEFAULT_WEEKDAYS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];
pub const DEFAULT_MUSCLE_GROUPS: [&str; 6] = ["Грудь", "Спина", "Ноги", "Руки", "Плечи", "Пресс"];

pub const REST_LABEL: &str = "Отдых";
pub const DONE_LABEL: &str = "Готово";

pub const PLAN_NOT_FOUND: &str = "План не найден ❌";
pub const PLAN_NOT_FOUND_FOR_DELETE: &str = "План не найден";
pub const DAY_NOT_FOUND: &str = "День не найден ❌";
pub const START_FIRST: &str = "Сначала используй /start";
pub const ASK_PLAN_NAME: &str = "Введите название нового плана:";
pub const EMPTY_PLAN_NAME: &str = "Название плана не может быть пустым. Введите название:";
pub const CHOOSE_DAY: &str = "Выберите день:";
pub const NO_PLANS: &str = "У тебя пока нет планов.";
pub const NO_PLANS_TO_DELETE: &str = "У тебя пока нет планов для удаления.";
pub const CHOOSE_PLAN_TO_VIEW: &str = "Выберите план для просмотра:";
pub const CHOOSE_PLAN_TO_DELETE: &str = "Выберите план для удаления:";
pub const MUSCLE_SELECTION_DONE: &str = "Выбор групп мышц завершён ✅";
pub const NO_MUSCLE_GROUPS: &str = "Нет групп мышц";

/// Weekday and muscle-group labels offered as buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub weekdays: Vec<String>,
    pub muscle_groups: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            weekdays: DEFAULT_WEEKDAYS.iter().map(|d| d.to_string()).collect(),
            muscle_groups: DEFAULT_MUSCLE_GROUPS.iter().map(|g| g.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<Button>>,
}

impl InlineKeyboard {
    pub fn single_column(buttons: impl IntoIterator<Item = Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|button| vec![button]).collect(),
        }
    }

    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|button| button.payload.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyMarkup {
    Inline { keyboard: InlineKeyboard },
    CommandMenu { rows: Vec<Vec<String>> },
}

/// One outbound message. `edit` asks the transport to rewrite the message the
/// callback came from instead of sending a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<ReplyMarkup>,
    #[serde(default)]
    pub edit: bool,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
            edit: false,
        }
    }

    pub fn edit(text: impl Into<String>) -> Self {
        Self {
            edit: true,
            ..Self::text(text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.markup = Some(ReplyMarkup::Inline { keyboard });
        self
    }

    pub fn with_command_menu(mut self) -> Self {
        self.markup = Some(command_menu());
        self
    }

    pub fn keyboard(&self) -> Option<&InlineKeyboard> {
        match &self.markup {
            Some(ReplyMarkup::Inline { keyboard }) => Some(keyboard),
            _ => None,
        }
    }
}

pub fn command_menu() -> ReplyMarkup {
    ReplyMarkup::CommandMenu {
        rows: vec![
            vec!["/add_plan".to_string(), "/plans".to_string()],
            vec!["/delete_plan".to_string(), "/help".to_string()],
            vec!["/add_exercise".to_string()],
        ],
    }
}

pub fn greeting(name: &str) -> String {
    format!("Привет, {name}! Я твой бот-дневник 💪")
}

pub fn help_text() -> String {
    [
        "/start - Запуск бота",
        "/add_plan - Создать новый план",
        "/plans - Просмотреть или редактировать планы",
        "/delete_plan - Удалить план",
        "/add_exercise - Добавить упражнения",
    ]
    .join("\n")
}

pub fn plan_created(name: &str) -> String {
    format!("План '{name}' создан! Теперь выберите день недели:")
}

pub fn plan_deleted(name: &str) -> String {
    format!("План '{name}' удалён ✅")
}

pub fn choose_muscles_prompt(weekday: &str) -> String {
    format!("{weekday}: Выберите группы мышц или '{REST_LABEL}':")
}

pub fn rest_recorded(weekday: &str) -> String {
    format!("{weekday}: {REST_LABEL} записан ✅")
}

pub fn muscle_added(name: &str) -> String {
    format!("{name} добавлена ✅")
}

pub fn muscle_already_added(name: &str) -> String {
    format!("{name} уже добавлена")
}

pub fn weekday_keyboard(catalog: &Catalog) -> InlineKeyboard {
    InlineKeyboard::single_column(
        catalog
            .weekdays
            .iter()
            .map(|day| Button::new(day, format!("day_{day}"))),
    )
}

/// Rest first, one row per muscle group, done last.
pub fn muscle_keyboard(catalog: &Catalog) -> InlineKeyboard {
    let mut rows = vec![vec![Button::new(REST_LABEL, "rest")]];
    rows.extend(
        catalog
            .muscle_groups
            .iter()
            .map(|group| vec![Button::new(group, format!("muscle_{group}"))]),
    );
    rows.push(vec![Button::new(DONE_LABEL, "done")]);
    InlineKeyboard { rows }
}

pub fn plan_keyboard(plans: &[Plan], payload_prefix: &str) -> InlineKeyboard {
    InlineKeyboard::single_column(
        plans
            .iter()
            .map(|plan| Button::new(&plan.name, format!("{payload_prefix}{}", plan.id))),
    )
}

pub fn render_plan(detail: &PlanDetail) -> String {
    let mut text = format!("План: {}\n\n", detail.plan.name);
    for day in &detail.days {
        text.push_str(&render_day_line(day));
        text.push('\n');
    }
    text
}

fn render_day_line(detail: &DayDetail) -> String {
    let summary = if detail.day.is_rest() {
        REST_LABEL.to_string()
    } else if detail.muscle_groups.is_empty() {
        NO_MUSCLE_GROUPS.to_string()
    } else {
        detail
            .muscle_groups
            .iter()
            .map(|group| group.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("{}: {summary}", detail.day.weekday)
}
