//! Routing of inbound chat events to handlers.
//!
//! Every event is classified into a [`Signal`], then matched against
//! [`ROUTES`]: the first route whose trigger fits the signal and whose state
//! gate fits the user's current wizard state wins. A handler receives the
//! event and the user's session by value and hands back the replies together
//! with the session to keep. Events no route accepts are dropped without a
//! reply.

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationStore, Session, SessionKey};
use crate::error::Result;
use crate::presentation::{self, Catalog, Reply};
use crate::store::{JournalStore, MuscleGroupInsert, Plan, User};
use crate::wizard_fsm::{self, WizardAction, WizardState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: i64,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Message { text: String },
    Callback { data: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incoming {
    pub user: ChatUser,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Incoming {
    pub fn message(user: ChatUser, text: impl Into<String>) -> Self {
        Self {
            user,
            payload: Payload::Message { text: text.into() },
        }
    }

    pub fn callback(user: ChatUser, data: impl Into<String>) -> Self {
        Self {
            user,
            payload: Payload::Callback { data: data.into() },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    AddPlan,
    Plans,
    DeletePlan,
    AddExercise,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "add_plan" => Some(Self::AddPlan),
            "plans" => Some(Self::Plans),
            "delete_plan" => Some(Self::DeletePlan),
            "add_exercise" => Some(Self::AddExercise),
            _ => None,
        }
    }
}

/// Button payloads understood by the wizard and the plan lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackToken {
    Day(String),
    Muscle(String),
    Rest,
    Done,
    ViewPlan(i32),
    DeletePlan(i32),
}

impl CallbackToken {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "rest" => return Some(Self::Rest),
            "done" => return Some(Self::Done),
            _ => {}
        }

        let (prefix, value) = data.split_once('_')?;
        if value.is_empty() {
            return None;
        }
        match prefix {
            "day" => Some(Self::Day(value.to_string())),
            "muscle" => Some(Self::Muscle(value.to_string())),
            "viewplan" => value.parse().ok().map(Self::ViewPlan),
            "delete" => value.parse().ok().map(Self::DeletePlan),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Command(Command),
    UnknownCommand(String),
    Text(String),
    Callback(CallbackToken),
    UnknownCallback(String),
}

impl Signal {
    pub fn classify(payload: &Payload) -> Self {
        match payload {
            Payload::Message { text } => match command_name(text) {
                Some(name) => Command::from_name(name)
                    .map(Signal::Command)
                    .unwrap_or_else(|| Signal::UnknownCommand(name.to_string())),
                None => Signal::Text(text.clone()),
            },
            Payload::Callback { data } => CallbackToken::parse(data)
                .map(Signal::Callback)
                .unwrap_or_else(|| Signal::UnknownCallback(data.clone())),
        }
    }
}

/// `/add_plan@GymBot extra` -> `add_plan`.
fn command_name(text: &str) -> Option<&str> {
    let word = text.trim_start().split_whitespace().next()?;
    let name = word.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Command(Command),
    Text,
    Day,
    Muscle,
    Rest,
    Done,
    ViewPlan,
    DeletePlan,
}

impl Trigger {
    fn matches(self, signal: &Signal) -> bool {
        match (self, signal) {
            (Trigger::Command(expected), Signal::Command(actual)) => expected == *actual,
            (Trigger::Text, Signal::Text(_)) => true,
            (Trigger::Day, Signal::Callback(CallbackToken::Day(_))) => true,
            (Trigger::Muscle, Signal::Callback(CallbackToken::Muscle(_))) => true,
            (Trigger::Rest, Signal::Callback(CallbackToken::Rest)) => true,
            (Trigger::Done, Signal::Callback(CallbackToken::Done)) => true,
            (Trigger::ViewPlan, Signal::Callback(CallbackToken::ViewPlan(_))) => true,
            (Trigger::DeletePlan, Signal::Callback(CallbackToken::DeletePlan(_))) => true,
            _ => false,
        }
    }
}

pub struct HandlerContext<'a> {
    pub store: &'a JournalStore,
    pub catalog: &'a Catalog,
}

pub struct HandlerCall<'a> {
    pub ctx: &'a HandlerContext<'a>,
    pub user: &'a ChatUser,
    pub signal: &'a Signal,
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub replies: Vec<Reply>,
    pub session: Session,
}

impl Outcome {
    fn new(session: Session) -> Self {
        Self {
            replies: Vec::new(),
            session,
        }
    }

    fn reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }
}

pub type HandlerFn = for<'a> fn(HandlerCall<'a>) -> BoxFuture<'a, Result<Outcome>>;

pub struct Route {
    pub name: &'static str,
    pub trigger: Trigger,
    /// `None` accepts the event in any wizard state.
    pub required_state: Option<WizardState>,
    pub handler: HandlerFn,
}

pub static ROUTES: &[Route] = &[
    Route {
        name: "start",
        trigger: Trigger::Command(Command::Start),
        required_state: None,
        handler: start,
    },
    Route {
        name: "help",
        trigger: Trigger::Command(Command::Help),
        required_state: None,
        handler: help,
    },
    Route {
        name: "add_plan",
        trigger: Trigger::Command(Command::AddPlan),
        required_state: None,
        handler: add_plan,
    },
    Route {
        name: "plans",
        trigger: Trigger::Command(Command::Plans),
        required_state: None,
        handler: list_plans,
    },
    Route {
        name: "delete_plan",
        trigger: Trigger::Command(Command::DeletePlan),
        required_state: None,
        handler: list_plans_for_delete,
    },
    Route {
        name: "plan_name",
        trigger: Trigger::Text,
        required_state: Some(WizardState::WaitingForPlanName),
        handler: create_plan,
    },
    Route {
        name: "choose_day",
        trigger: Trigger::Day,
        required_state: Some(WizardState::ChoosingDay),
        handler: choose_day,
    },
    Route {
        name: "choose_rest",
        trigger: Trigger::Rest,
        required_state: Some(WizardState::ChoosingMuscleOrRest),
        handler: choose_rest,
    },
    Route {
        name: "finish_day",
        trigger: Trigger::Done,
        required_state: Some(WizardState::ChoosingMuscleOrRest),
        handler: finish_day,
    },
    Route {
        name: "choose_muscle",
        trigger: Trigger::Muscle,
        required_state: Some(WizardState::ChoosingMuscleOrRest),
        handler: choose_muscle,
    },
    Route {
        name: "view_plan",
        trigger: Trigger::ViewPlan,
        required_state: None,
        handler: view_plan,
    },
    Route {
        name: "delete_plan_confirm",
        trigger: Trigger::DeletePlan,
        required_state: None,
        handler: delete_plan,
    },
];

pub fn find_route(signal: &Signal, state: WizardState) -> Option<&'static Route> {
    ROUTES.iter().find(|route| {
        route.trigger.matches(signal)
            && route
                .required_state
                .map_or(true, |required| required == state)
    })
}

/// Classifies the payload and finds its route. A slash message that no
/// command route takes is retried as plain text, so `/5x5` can name a plan.
pub fn resolve(payload: &Payload, state: WizardState) -> (Signal, Option<&'static Route>) {
    let signal = Signal::classify(payload);
    if let Some(route) = find_route(&signal, state) {
        return (signal, Some(route));
    }
    let Payload::Message { text } = payload else {
        return (signal, None);
    };
    if !matches!(signal, Signal::Command(_) | Signal::UnknownCommand(_)) {
        return (signal, None);
    }
    let text = Signal::Text(text.clone());
    let route = find_route(&text, state);
    (text, route)
}

/// Runs one event end to end and commits the resulting session. A failing
/// handler leaves the session as it was.
pub async fn dispatch(
    ctx: &HandlerContext<'_>,
    sessions: &ConversationStore,
    event: &Incoming,
) -> Result<Vec<Reply>> {
    let session = sessions.get(event.user.id);
    let (signal, route) = resolve(&event.payload, session.state);
    let Some(route) = route else {
        tracing::debug!(
            user = event.user.id,
            state = ?session.state,
            signal = ?signal,
            "No route for event"
        );
        return Ok(Vec::new());
    };

    tracing::debug!(user = event.user.id, route = route.name, state = ?session.state, "Dispatching");
    let outcome = (route.handler)(HandlerCall {
        ctx,
        user: &event.user,
        signal: &signal,
        session,
    })
    .await?;

    sessions.replace(event.user.id, outcome.session);
    Ok(outcome.replies)
}

fn advance(session: Session, action: WizardAction) -> Session {
    match wizard_fsm::transition(session.state, action) {
        Some(WizardState::Idle) => Session::idle(),
        Some(next) => session.with_state(next),
        None => {
            tracing::warn!(state = ?session.state, ?action, "Rejected wizard transition");
            Session::idle()
        }
    }
}

fn owned_by(plan: &Plan, user: Option<&User>) -> bool {
    user.is_some_and(|user| user.id == plan.user_id)
}

fn start(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let user = call
            .ctx
            .store
            .get_or_create_user(call.user.id, call.user.full_name.as_deref())
            .await?;
        let name = user
            .name
            .as_deref()
            .or(call.user.full_name.as_deref())
            .unwrap_or("друг");
        Ok(Outcome::new(Session::idle())
            .reply(Reply::text(presentation::greeting(name)).with_command_menu()))
    }
    .boxed()
}

fn help(_call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        Ok(Outcome::new(Session::idle())
            .reply(Reply::text(presentation::help_text()).with_command_menu()))
    }
    .boxed()
}

fn add_plan(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        if call.ctx.store.find_user(call.user.id).await?.is_none() {
            return Ok(Outcome::new(Session::idle())
                .reply(Reply::text(presentation::START_FIRST).with_command_menu()));
        }
        Ok(
            Outcome::new(advance(Session::idle(), WizardAction::BeginPlan))
                .reply(Reply::text(presentation::ASK_PLAN_NAME).with_command_menu()),
        )
    }
    .boxed()
}

fn create_plan(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let Signal::Text(name) = call.signal else {
            return Ok(Outcome::new(call.session));
        };
        let Some(user) = call.ctx.store.find_user(call.user.id).await? else {
            return Ok(Outcome::new(Session::idle())
                .reply(Reply::text(presentation::START_FIRST).with_command_menu()));
        };
        if name.trim().is_empty() {
            return Ok(Outcome::new(call.session).reply(Reply::text(presentation::EMPTY_PLAN_NAME)));
        }

        let plan = call.ctx.store.create_plan(user.id, name).await?;
        let session =
            advance(call.session, WizardAction::NamePlan).with(SessionKey::PlanId, plan.id);
        Ok(Outcome::new(session)
            .reply(Reply::text(presentation::plan_created(&plan.name)).with_command_menu())
            .reply(
                Reply::text(presentation::CHOOSE_DAY)
                    .with_keyboard(presentation::weekday_keyboard(call.ctx.catalog)),
            ))
    }
    .boxed()
}

fn choose_day(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let Signal::Callback(CallbackToken::Day(weekday)) = call.signal else {
            return Ok(Outcome::new(call.session));
        };
        let plan = match call.session.data.get(SessionKey::PlanId) {
            Some(plan_id) => call.ctx.store.find_plan(plan_id).await?,
            None => None,
        };
        let Some(plan) = plan else {
            return Ok(Outcome::new(Session::idle()).reply(Reply::edit(presentation::PLAN_NOT_FOUND)));
        };

        let day = call.ctx.store.create_day(plan.id, weekday).await?;
        let session = advance(call.session, WizardAction::PickDay).with(SessionKey::DayId, day.id);
        Ok(Outcome::new(session).reply(
            Reply::edit(presentation::choose_muscles_prompt(&day.weekday))
                .with_keyboard(presentation::muscle_keyboard(call.ctx.catalog)),
        ))
    }
    .boxed()
}

fn choose_rest(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let day = match call.session.data.get(SessionKey::DayId) {
            Some(day_id) => call.ctx.store.mark_rest(day_id).await?,
            None => None,
        };
        let Some(day) = day else {
            return Ok(Outcome::new(Session::idle()).reply(Reply::edit(presentation::DAY_NOT_FOUND)));
        };
        Ok(Outcome::new(advance(call.session, WizardAction::PickRest))
            .reply(Reply::edit(presentation::rest_recorded(&day.weekday))))
    }
    .boxed()
}

fn finish_day(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        Ok(Outcome::new(advance(call.session, WizardAction::Finish))
            .reply(Reply::edit(presentation::MUSCLE_SELECTION_DONE)))
    }
    .boxed()
}

fn choose_muscle(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let Signal::Callback(CallbackToken::Muscle(name)) = call.signal else {
            return Ok(Outcome::new(call.session));
        };
        let day = match call.session.data.get(SessionKey::DayId) {
            Some(day_id) => call.ctx.store.find_day(day_id).await?,
            None => None,
        };
        let Some(day) = day else {
            return Ok(Outcome::new(Session::idle()).reply(Reply::edit(presentation::DAY_NOT_FOUND)));
        };

        let session = advance(call.session, WizardAction::PickMuscle);
        match call.ctx.store.add_muscle_group(day.id, name).await? {
            MuscleGroupInsert::Added(group) => Ok(Outcome::new(
                session.with(SessionKey::MuscleGroupId, group.id),
            )
            .reply(Reply::text(presentation::muscle_added(&group.name)))),
            MuscleGroupInsert::AlreadyAdded(group) => Ok(Outcome::new(session)
                .reply(Reply::text(presentation::muscle_already_added(&group.name)))),
        }
    }
    .boxed()
}

fn list_plans(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let plans = plans_of(&call).await?;
        let reply = if plans.is_empty() {
            Reply::text(presentation::NO_PLANS).with_command_menu()
        } else {
            Reply::text(presentation::CHOOSE_PLAN_TO_VIEW)
                .with_keyboard(presentation::plan_keyboard(&plans, "viewplan_"))
        };
        Ok(Outcome::new(Session::idle()).reply(reply))
    }
    .boxed()
}

fn list_plans_for_delete(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let plans = plans_of(&call).await?;
        let reply = if plans.is_empty() {
            Reply::text(presentation::NO_PLANS_TO_DELETE).with_command_menu()
        } else {
            Reply::text(presentation::CHOOSE_PLAN_TO_DELETE)
                .with_keyboard(presentation::plan_keyboard(&plans, "delete_"))
        };
        Ok(Outcome::new(Session::idle()).reply(reply))
    }
    .boxed()
}

async fn plans_of(call: &HandlerCall<'_>) -> Result<Vec<Plan>> {
    match call.ctx.store.find_user(call.user.id).await? {
        Some(user) => call.ctx.store.list_plans(user.id).await,
        None => Ok(Vec::new()),
    }
}

fn view_plan(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let Signal::Callback(CallbackToken::ViewPlan(plan_id)) = call.signal else {
            return Ok(Outcome::new(call.session));
        };
        let user = call.ctx.store.find_user(call.user.id).await?;
        let detail = call
            .ctx
            .store
            .load_plan(*plan_id)
            .await?
            .filter(|detail| owned_by(&detail.plan, user.as_ref()));

        let reply = match detail {
            Some(detail) => Reply::edit(presentation::render_plan(&detail)),
            None => Reply::edit(presentation::PLAN_NOT_FOUND),
        };
        Ok(Outcome::new(call.session).reply(reply))
    }
    .boxed()
}

fn delete_plan(call: HandlerCall<'_>) -> BoxFuture<'_, Result<Outcome>> {
    async move {
        let Signal::Callback(CallbackToken::DeletePlan(plan_id)) = call.signal else {
            return Ok(Outcome::new(call.session));
        };
        let user = call.ctx.store.find_user(call.user.id).await?;
        let owned = call
            .ctx
            .store
            .find_plan(*plan_id)
            .await?
            .filter(|plan| owned_by(plan, user.as_ref()));
        let deleted = match owned {
            Some(plan) => call.ctx.store.delete_plan(plan.id).await?,
            None => None,
        };

        let Some(plan) = deleted else {
            return Ok(
                Outcome::new(call.session).reply(Reply::edit(presentation::PLAN_NOT_FOUND_FOR_DELETE))
            );
        };

        // The wizard may still point at the plan that just went away.
        let session = if call.session.data.get(SessionKey::PlanId) == Some(plan.id) {
            Session::idle()
        } else {
            call.session
        };
        Ok(Outcome::new(session).reply(Reply::edit(presentation::plan_deleted(&plan.name))))
    }
    .boxed()
}
