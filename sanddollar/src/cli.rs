//! Command-line driver for the wizard, the assistant and bank linking.

use crate::auth::{self, TokenStore};
use crate::budget::{BudgetStyle, GoalFormData};
use crate::chat::{Assistant, AssistantReply, CancellationToken};
use crate::notify::Notification;
use crate::plaid::PlaidLink;
use crate::settings::{DataMode, Settings};
use crate::store::{FileStore, KeyValueStore};
use crate::wizard::{BudgetBackend, DemoBackend, SubmitOutcome, WizardController, WizardStep};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;

#[derive(Parser, Debug)]
#[command(name = "sanddollar", about = "AI-assisted monthly budgeting", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a budget for this month from your goals
    Budget(BudgetArgs),
    /// Edit the saved goal form without generating
    Goals(GoalsArgs),
    /// Reopen the accepted targets for this month
    Targets {
        /// Accept the targets again after printing them
        #[arg(long)]
        accept: bool,
    },
    /// Ask the budget assistant a question or give it an instruction
    Chat {
        message: String,

        /// Stream the answer token by token
        #[arg(long)]
        stream: bool,
    },
    /// Sign in and store the session token
    Login { email: String, password: String },
    /// Forget the stored session token
    Logout,
    /// Bank linking
    #[command(subcommand)]
    Plaid(PlaidCommand),
}

/// Goal form fields, layered onto the saved form.
#[derive(Args, Debug, Default)]
pub struct GoalArgs {
    /// A financial goal; repeat for several
    #[arg(short, long = "goal")]
    pub goals: Vec<String>,

    #[arg(short, long)]
    pub style: Option<BudgetStyle>,

    /// Category that must keep at least its current spending
    #[arg(long = "must-keep")]
    pub must_keep: Vec<String>,

    /// Spending cap as CATEGORY=AMOUNT
    #[arg(long = "cap", value_parser = parse_cap)]
    pub caps: Vec<(String, f64)>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl GoalArgs {
    pub fn apply(&self, form: &mut GoalFormData) {
        for goal in &self.goals {
            form.add_goal(goal);
        }
        if let Some(style) = self.style {
            form.style = style;
        }
        for category in &self.must_keep {
            form.add_must_keep_category(category);
        }
        for (category, amount) in &self.caps {
            form.set_category_cap(category, *amount);
        }
        if self.notes.is_some() {
            form.notes = self.notes.clone();
        }
    }
}

#[derive(Args, Debug)]
pub struct BudgetArgs {
    #[command(flatten)]
    pub form: GoalArgs,

    /// Ignore the saved goal form
    #[arg(long)]
    pub fresh: bool,

    /// Accept the generated targets
    #[arg(long)]
    pub accept: bool,

    /// Category edits applied before accepting, as CATEGORY=AMOUNT
    #[arg(long = "set", value_parser = parse_cap)]
    pub edits: Vec<(String, f64)>,
}

impl BudgetArgs {
    /// The saved form (unless `--fresh`) with the command-line fields applied.
    pub fn goal_form(&self, saved: Option<&GoalFormData>) -> GoalFormData {
        let mut form = match saved {
            Some(saved) if !self.fresh => saved.clone(),
            _ => GoalFormData::default(),
        };
        self.form.apply(&mut form);
        form
    }
}

#[derive(Args, Debug)]
pub struct GoalsArgs {
    #[command(flatten)]
    pub form: GoalArgs,

    #[arg(long = "drop-goal")]
    pub drop_goals: Vec<String>,

    #[arg(long = "drop-must-keep")]
    pub drop_must_keep: Vec<String>,

    #[arg(long = "drop-cap")]
    pub drop_caps: Vec<String>,

    /// Start over from an empty form
    #[arg(long)]
    pub clear: bool,
}

impl GoalsArgs {
    pub fn edit(&self, saved: Option<&GoalFormData>) -> GoalFormData {
        let mut form = match saved {
            Some(saved) if !self.clear => saved.clone(),
            _ => GoalFormData::default(),
        };
        for goal in &self.drop_goals {
            form.remove_goal(goal.trim());
        }
        for category in &self.drop_must_keep {
            form.remove_must_keep_category(category.trim());
        }
        for category in &self.drop_caps {
            form.remove_category_cap(category.trim());
        }
        self.form.apply(&mut form);
        form
    }
}

#[derive(Subcommand, Debug)]
pub enum PlaidCommand {
    /// Whether a bank is linked
    Status,
    /// Create a Plaid Link token
    LinkToken,
    /// Exchange a public token from Plaid Link and sync
    Connect { public_token: String },
    /// Pull new transactions
    Sync,
}

pub fn parse_cap(raw: &str) -> Result<(String, f64), String> {
    let (category, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=AMOUNT, got '{}'", raw))?;
    let category = category.trim();
    if category.is_empty() {
        return Err("category name is empty".to_string());
    }
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", amount.trim()))?;
    Ok((category.to_string(), amount))
}

pub async fn run(cli: Cli, settings: Settings) -> Result<()> {
    let tokens = TokenStore::new()?;

    match cli.command {
        Command::Budget(args) => match settings.data_mode {
            DataMode::Mock => run_budget(wizard(DemoBackend::new())?, &args).await,
            DataMode::Live => {
                let client = auth::authenticated_client(&settings.api_base_url, &tokens);
                run_budget(wizard(client)?, &args).await
            }
        },
        Command::Goals(args) => run_goals(wizard(DemoBackend::new())?, &args),
        Command::Targets { accept } => match settings.data_mode {
            DataMode::Mock => run_targets(wizard(DemoBackend::new())?, accept).await,
            DataMode::Live => {
                let client = auth::authenticated_client(&settings.api_base_url, &tokens);
                run_targets(wizard(client)?, accept).await
            }
        },
        Command::Chat { message, stream } => {
            if settings.data_mode == DataMode::Mock {
                bail!("The assistant needs a live backend (data_mode = \"live\")");
            }
            let assistant = Assistant::new(
                auth::authenticated_client(&settings.api_base_url, &tokens),
                auth::authenticated_client(&settings.api_base_url, &tokens),
            )
            .streaming(stream);
            run_chat(assistant, &message).await
        }
        Command::Login { email, password } => {
            let client = sanddollar_api::Client::new(&settings.api_base_url);
            auth::login(&client, &tokens, &email, &password).await?;
            println!("Signed in.");
            Ok(())
        }
        Command::Logout => {
            auth::logout(&tokens)?;
            println!("Signed out.");
            Ok(())
        }
        Command::Plaid(command) => {
            let client = auth::authenticated_client(&settings.api_base_url, &tokens);
            run_plaid(&client, &settings, command).await
        }
    }
}

fn wizard<B: BudgetBackend>(backend: B) -> Result<WizardController<B, FileStore>> {
    let store = FileStore::new().context("opening wizard state")?;
    Ok(WizardController::new(backend, store))
}

async fn run_budget<B: BudgetBackend, K: KeyValueStore>(
    mut wizard: WizardController<B, K>,
    args: &BudgetArgs,
) -> Result<()> {
    let form = args.goal_form(wizard.state().goals.as_ref());
    wizard.start().await;
    if let Some(snapshot) = wizard.snapshot() {
        println!(
            "{}: income {:.2}, spending {:.2}",
            snapshot.month, snapshot.income, snapshot.totals.expenses
        );
    }
    wizard.continue_to_goals()?;

    match wizard.submit_goals(form).await {
        SubmitOutcome::Generated => {}
        SubmitOutcome::Invalid => {
            bail!("{}", wizard.form_errors().messages().join("\n"));
        }
        SubmitOutcome::Failed(kind) => {
            eprintln!("{}", kind.message());
            if wizard.banner().is_some_and(|banner| banner.can_use_heuristic()) {
                eprintln!("Using a heuristic budget instead.");
                wizard.use_heuristic()?;
            } else {
                bail!("No budget could be generated");
            }
        }
    }

    for (category, amount) in &args.edits {
        wizard.edit_target(category.clone(), *amount);
    }
    print_review(&wizard);

    if args.accept {
        accept(&mut wizard).await?;
    }
    Ok(())
}

fn run_goals<B: BudgetBackend, K: KeyValueStore>(
    mut wizard: WizardController<B, K>,
    args: &GoalsArgs,
) -> Result<()> {
    let form = args.edit(wizard.state().goals.as_ref());
    print_goal_form(&form);
    wizard.update_goals(form);
    Ok(())
}

fn print_goal_form(form: &GoalFormData) {
    println!("Goals ({}): {}", form.style, form.goals.iter().join(", "));
    if let Some(keep) = form.must_keep_categories.as_ref().filter(|c| !c.is_empty()) {
        println!("  must keep: {}", keep.iter().join(", "));
    }
    if let Some(caps) = form.category_caps.as_ref().filter(|c| !c.is_empty()) {
        let caps = caps
            .iter()
            .map(|(category, cap)| format!("{}={:.2}", category, cap))
            .join(", ");
        println!("  caps: {}", caps);
    }
    if let Some(notes) = &form.notes {
        println!("  notes: {}", notes);
    }
}

async fn run_targets<B: BudgetBackend, K: KeyValueStore>(
    mut wizard: WizardController<B, K>,
    accept_again: bool,
) -> Result<()> {
    wizard.adjust_targets().await;
    if wizard.step() != WizardStep::Review {
        println!("No accepted targets for this month yet. Run `sanddollar budget` first.");
        return Ok(());
    }
    print_review(&wizard);
    if accept_again {
        accept(&mut wizard).await?;
    }
    Ok(())
}

async fn accept<B: BudgetBackend, K: KeyValueStore>(
    wizard: &mut WizardController<B, K>,
) -> Result<()> {
    let result = wizard.accept().await;
    print_notifications(wizard.take_notifications());
    result?;
    Ok(())
}

fn print_review<B: BudgetBackend, K: KeyValueStore>(wizard: &WizardController<B, K>) {
    let Some(summary) = wizard.review_summary() else {
        return;
    };

    println!("{}: {}", wizard.step().title(), wizard.budget_month());
    for row in &summary.rows {
        let flag = if row.over_budget { "  over budget" } else { "" };
        println!(
            "  {:<20} target {:>10.2}  actual {:>10.2}  variance {:>10.2}{}",
            row.category, row.target, row.actual, row.variance, flag
        );
    }
    println!(
        "  {:<20} target {:>10.2}  actual {:>10.2}",
        "Total", summary.total_targets, summary.total_actuals
    );

    if let Some(budget) = &wizard.state().generated_budget {
        if !budget.summary.notes.is_empty() {
            println!("Notes: {}", budget.summary.notes.iter().join("; "));
        }
    }
}

async fn run_chat<B, T>(mut assistant: Assistant<B, T>, message: &str) -> Result<()>
where
    B: crate::chat::AssistantBackend,
    T: crate::chat::ChatTransport,
{
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let reply = assistant.send(message, &cancel).await;
    print_notifications(assistant.take_notifications());

    if reply == AssistantReply::NeedsConfirmation {
        if let Some(pending) = assistant.pending_adjustment() {
            println!(
                "{}",
                pending
                    .response
                    .message
                    .as_deref()
                    .unwrap_or("This change needs confirmation.")
            );
        }
        assistant.dismiss_adjustment();
        return Ok(());
    }

    if let Some(last) = assistant.messages().last() {
        if reply != AssistantReply::Adjusted {
            println!("{}", last.content);
        }
    }
    Ok(())
}

async fn run_plaid(
    client: &sanddollar_api::Client,
    settings: &Settings,
    command: PlaidCommand,
) -> Result<()> {
    let plaid = PlaidLink::new(client, settings)?;
    match command {
        PlaidCommand::Status => {
            let status = plaid.status().await?;
            println!(
                "{}",
                if status.has_item {
                    "Bank account linked."
                } else {
                    "No bank account linked."
                }
            );
        }
        PlaidCommand::LinkToken => println!("{}", plaid.link_token().await?),
        PlaidCommand::Connect { public_token } => {
            plaid.connect(&public_token).await?;
            println!("Bank account linked and synced.");
        }
        PlaidCommand::Sync => {
            plaid.sync().await?;
            println!("Transactions synced.");
        }
    }
    Ok(())
}

fn print_notifications(notifications: Vec<Notification>) {
    for notification in notifications {
        if notification.is_error() {
            eprintln!("{}", notification.message());
        } else {
            println!("{}", notification.message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::wizard::validate_goal_form;
    use crate::wizard::validators::{CAPS_NOT_POSITIVE, GOALS_REQUIRED};

    #[test]
    fn parses_caps() {
        assert_eq!(parse_cap("Dining=250").unwrap(), ("Dining".to_string(), 250.0));
        assert_eq!(
            parse_cap(" Eating Out = 99.5 ").unwrap(),
            ("Eating Out".to_string(), 99.5)
        );
        assert!(parse_cap("Dining").is_err());
        assert!(parse_cap("=20").is_err());
        assert!(parse_cap("Dining=lots").is_err());
    }

    fn budget_args(args: &[&str]) -> BudgetArgs {
        let argv = ["sanddollar", "budget"].iter().chain(args).copied();
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Budget(args) = cli.command else {
            panic!("expected budget command");
        };
        args
    }

    fn goals_args(args: &[&str]) -> GoalsArgs {
        let argv = ["sanddollar", "goals"].iter().chain(args).copied();
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Goals(args) = cli.command else {
            panic!("expected goals command");
        };
        args
    }

    #[test]
    fn budget_arguments_build_a_goal_form() {
        let args = budget_args(&[
            "--goal",
            "Emergency fund",
            "--goal",
            "Emergency fund",
            "--style",
            "aggressive",
            "--must-keep",
            "Rent",
            "--cap",
            "Dining=200",
        ]);

        let form = args.goal_form(None);
        assert_eq!(form.goals, vec!["Emergency fund".to_string()]);
        assert_eq!(form.style, BudgetStyle::Aggressive);
        assert!(form.is_must_keep("rent"));
        assert_eq!(form.cap_for("Dining"), Some(200.0));
        assert!(!args.accept);
    }

    #[test]
    fn zero_cap_is_reported_by_validation() {
        let args = budget_args(&["--goal", "Vacation", "--cap", "Travel=0"]);

        let form = args.goal_form(None);
        assert_eq!(form.cap_for("Travel"), Some(0.0));
        let errors = validate_goal_form(&form).unwrap_err();
        assert_eq!(errors.messages(), vec![CAPS_NOT_POSITIVE]);
    }

    #[test]
    fn budget_without_goals_fails_validation() {
        let form = budget_args(&[]).goal_form(None);
        let errors = validate_goal_form(&form).unwrap_err();
        assert_eq!(errors.messages(), vec![GOALS_REQUIRED]);
    }

    #[test]
    fn budget_builds_on_the_saved_form() {
        let mut saved = GoalFormData::new(vec!["Pay off card".to_string()], BudgetStyle::Flexible);
        saved.notes = Some("Trip in March".to_string());

        let form = budget_args(&["--goal", "Emergency fund"]).goal_form(Some(&saved));
        assert_eq!(form.goals, vec!["Pay off card".to_string(), "Emergency fund".to_string()]);
        assert_eq!(form.style, BudgetStyle::Flexible);
        assert_eq!(form.notes.as_deref(), Some("Trip in March"));

        let fresh = budget_args(&["--fresh", "--goal", "Emergency fund"]).goal_form(Some(&saved));
        assert_eq!(fresh.goals, vec!["Emergency fund".to_string()]);
        assert_eq!(fresh.style, BudgetStyle::Balanced);
        assert_eq!(fresh.notes, None);
    }

    #[test]
    fn goals_command_edits_the_saved_form() {
        let mut saved = GoalFormData::new(
            vec!["Pay off card".to_string(), "Vacation".to_string()],
            BudgetStyle::Balanced,
        );
        saved.add_must_keep_category("Rent");
        saved.set_category_cap("Dining", 250.0);
        saved.set_category_cap("Travel", 400.0);

        let form = goals_args(&[
            "--drop-goal",
            "Vacation",
            "--drop-must-keep",
            "Rent",
            "--drop-cap",
            "Travel",
            "--goal",
            "Emergency fund",
            "--style",
            "aggressive",
        ])
        .edit(Some(&saved));

        assert_eq!(form.goals, vec!["Pay off card".to_string(), "Emergency fund".to_string()]);
        assert_eq!(form.style, BudgetStyle::Aggressive);
        assert!(!form.is_must_keep("Rent"));
        assert_eq!(form.cap_for("Dining"), Some(250.0));
        assert_eq!(form.cap_for("Travel"), None);

        let cleared = goals_args(&["--clear"]).edit(Some(&saved));
        assert_eq!(cleared, GoalFormData::default());
    }

    #[test]
    fn goals_command_persists_the_draft() {
        let store = MemoryStore::new();
        let wizard = WizardController::new(DemoBackend::new(), store.clone());
        run_goals(wizard, &goals_args(&["--goal", "Emergency fund"])).unwrap();

        let resumed = WizardController::new(DemoBackend::new(), store);
        let draft = resumed.state().goals.clone().unwrap();
        assert_eq!(draft.goals, vec!["Emergency fund".to_string()]);
    }
}
