use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};
use tracing::info;

use topic_fabric::{DepositEvent, EventFabric};
use topic_ledger::{
    DepositReceipt, LedgerValidator, ProjectionBuilder, TopicLedger, TopicReader, TopicSnapshot,
    TopicSummary, ValidationReport,
};
use topic_sdk::{SimulatedChain, TopicHost, Vault};
use topic_types::{Amount, BlockHeight, ParticipantId};

use crate::cli::*;
use crate::config::ScenarioFile;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Check(args) => cmd_check(args, format),
        Command::Simulate(args) => cmd_simulate(args, format),
        Command::Verify(args) => cmd_verify(args, format),
        Command::Balance(args) => cmd_balance(args, format),
        Command::Summary(args) => cmd_summary(args, format),
    }
}

/// Outcome of one scripted deposit.
pub(crate) struct Step {
    pub index: usize,
    pub participant: String,
    pub outcome: usize,
    pub amount: Amount,
    pub height: BlockHeight,
    pub result: Result<DepositReceipt, String>,
}

pub(crate) struct Simulation {
    pub host: TopicHost<SimulatedChain>,
    pub steps: Vec<Step>,
    pub events: Vec<DepositEvent>,
}

/// Run every scripted deposit through a hosted topic. Rejected deposits
/// are recorded as failed steps, not errors.
pub(crate) fn simulate(scenario: &ScenarioFile) -> anyhow::Result<Simulation> {
    let issues = scenario.issues();
    if !issues.is_empty() {
        bail!("scenario has {} issue(s): {}", issues.len(), issues.join("; "));
    }

    let vault = Arc::new(Vault::new());
    let mut ids = BTreeMap::new();
    for p in &scenario.participants {
        let id = ParticipantId::from_alias(&p.alias);
        vault.fund(&id, Amount::from(p.funds))?;
        ids.insert(p.alias.as_str(), id);
    }

    let chain = Arc::new(SimulatedChain::new(BlockHeight::new(
        scenario.chain.start_height,
    )));
    let fabric = Arc::new(EventFabric::new(scenario.fabric.clone()));
    let host = TopicHost::with_fabric(scenario.topic_params(), chain, vault, fabric)?;
    let mut stream = host.subscribe();

    let mut steps = Vec::with_capacity(scenario.deposits.len());
    let mut events = Vec::new();
    for (i, deposit) in scenario.deposits.iter().enumerate() {
        let participant = ids
            .get(deposit.participant.as_str())
            .with_context(|| format!("unknown participant {:?}", deposit.participant))?;
        if let Some(h) = deposit.height {
            host.chain().mine_to(BlockHeight::new(h));
        }
        let height = host.current_height();
        let amount = Amount::from(deposit.amount);

        let result = host
            .deposit(participant, deposit.outcome, amount)
            .map_err(|e| e.to_string());
        events.extend(stream.drain());
        steps.push(Step {
            index: i + 1,
            participant: deposit.participant.clone(),
            outcome: deposit.outcome,
            amount,
            height,
            result,
        });
    }

    info!(
        topic = %host.topic_id(),
        steps = steps.len(),
        accepted = steps.iter().filter(|s| s.result.is_ok()).count(),
        events = events.len(),
        "simulation finished"
    );
    Ok(Simulation {
        host,
        steps,
        events,
    })
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let scenario = ScenarioFile::load(&args.scenario)?;
    let issues = scenario.issues();

    match format {
        OutputFormat::Json => emit(json!({
            "scenario": args.scenario.display().to_string(),
            "valid": issues.is_empty(),
            "issues": issues,
        }))?,
        OutputFormat::Text => {
            if issues.is_empty() {
                println!(
                    "{} Scenario {} is valid ({} participant(s), {} deposit(s))",
                    "✓".green().bold(),
                    args.scenario.display().to_string().bold(),
                    scenario.participants.len(),
                    scenario.deposits.len()
                );
            } else {
                for issue in &issues {
                    println!("  {} {}", "✗".red(), issue);
                }
            }
        }
    }

    if !issues.is_empty() {
        bail!("scenario has {} issue(s)", issues.len());
    }
    Ok(())
}

fn cmd_simulate(args: SimulateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let scenario = ScenarioFile::load(&args.scenario)?;
    let sim = simulate(&scenario)?;
    let ledger = sim.host.ledger();
    let summary = sim.host.summary()?;

    if let Some(path) = &args.snapshot {
        write_snapshot(&ledger.snapshot()?, path)?;
    }

    match format {
        OutputFormat::Json => emit(json!({
            "steps": sim.steps.iter().map(step_json).collect::<Vec<_>>(),
            "events": sim.events.len(),
            "custody": sim.host.custody_balance()?.to_string(),
            "summary": summary_json(&summary),
        }))?,
        OutputFormat::Text => {
            for step in &sim.steps {
                let label = ledger
                    .outcome_label(step.outcome)
                    .map(ToString::to_string)
                    .unwrap_or_else(|_| "?".into());
                let head = format!(
                    "#{} {} → {} ({}) {} at {}",
                    step.index, step.participant, label, step.outcome, step.amount, step.height
                );
                match &step.result {
                    Ok(receipt) => println!(
                        "  {} {}  {}",
                        "✓".green(),
                        head,
                        format!("r#{} {}", receipt.seq, receipt.short_hash()).yellow()
                    ),
                    Err(e) => println!("  {} {}  {}", "✗".red(), head, e.dimmed()),
                }
            }
            println!(
                "\n{} event(s) delivered, custody holds {}",
                sim.events.len().to_string().bold(),
                sim.host.custody_balance()?.to_string().bold()
            );
            print_summary(&summary);
            if let Some(path) = &args.snapshot {
                println!("Snapshot written to {}", path.display().to_string().bold());
            }
        }
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let report = verify_snapshot(&snapshot)?;

    match format {
        OutputFormat::Json => emit(json!({
            "topic": report.topic.to_hex(),
            "receipts": report.receipt_count,
            "valid": report.is_valid(),
            "hash_chain_valid": report.hash_chain_valid,
            "sequence_monotonic": report.sequence_monotonic,
            "deposits_in_window": report.deposits_in_window,
            "balances_conserved": report.balances_conserved,
            "replay_consistent": report.replay_consistent,
            "violations": report.violations.iter().map(|v| json!({
                "seq": v.seq,
                "kind": format!("{:?}", v.kind),
                "description": v.description,
            })).collect::<Vec<_>>(),
        }))?,
        OutputFormat::Text => {
            let mark = |ok: bool| if ok { "valid".green() } else { "broken".red() };
            if report.is_valid() {
                println!("{} Receipt journal verified", "✓".green().bold());
            } else {
                println!("{} Receipt journal failed verification", "✗".red().bold());
            }
            println!("  Topic: {}", report.topic.short_id().cyan());
            println!("  Receipts: {}", report.receipt_count);
            println!("  Hash chain: {}", mark(report.hash_chain_valid));
            println!("  Sequences: {}", mark(report.sequence_monotonic));
            println!("  Deadline: {}", mark(report.deposits_in_window));
            println!("  Conservation: {}", mark(report.balances_conserved));
            println!("  Replay: {}", mark(report.replay_consistent));
            for v in &report.violations {
                println!("  {} seq {} {:?}: {}", "✗".red(), v.seq, v.kind, v.description);
            }
        }
    }

    if !report.is_valid() {
        bail!(
            "snapshot failed verification with {} violation(s)",
            report.violations.len()
        );
    }
    Ok(())
}

fn cmd_balance(args: BalanceArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = restore(&args.snapshot)?;
    let participant = resolve_participant(&args.participant)?;

    let rows = match args.outcome {
        Some(index) => vec![(index, ledger.participant_balance(&participant, index)?)],
        None => ProjectionBuilder::position(&ledger, &participant)?
            .balances
            .into_iter()
            .enumerate()
            .collect(),
    };

    match format {
        OutputFormat::Json => emit(json!({
            "participant": participant.to_hex(),
            "balances": rows.iter().map(|(index, balance)| json!({
                "outcome": index,
                "label": ledger.outcome_label(*index).map(ToString::to_string).ok(),
                "balance": balance.to_string(),
            })).collect::<Vec<_>>(),
        }))?,
        OutputFormat::Text => {
            println!("Participant {} ({})", args.participant.bold(), participant.short_id().cyan());
            for (index, balance) in &rows {
                let label = ledger.outcome_label(*index)?;
                println!("  {:>3} {:<32} {}", index, label.to_string(), balance.to_string().bold());
            }
        }
    }
    Ok(())
}

fn cmd_summary(args: SummaryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = restore(&args.snapshot)?;
    let height = match args.height {
        Some(h) => BlockHeight::new(h),
        None => ledger
            .head()?
            .map(|r| r.block_height)
            .unwrap_or(BlockHeight::GENESIS),
    };
    let summary = ProjectionBuilder::summary(&ledger, height)?;

    match format {
        OutputFormat::Json => emit(summary_json(&summary))?,
        OutputFormat::Text => print_summary(&summary),
    }
    Ok(())
}

pub(crate) fn load_snapshot(path: &Path) -> anyhow::Result<TopicSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    TopicSnapshot::from_json(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

pub(crate) fn write_snapshot(snapshot: &TopicSnapshot, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, snapshot.to_json()?)
        .with_context(|| format!("writing snapshot {}", path.display()))
}

pub(crate) fn verify_snapshot(snapshot: &TopicSnapshot) -> anyhow::Result<ValidationReport> {
    let definition = snapshot
        .params
        .validate()
        .context("snapshot topic parameters are invalid")?;
    let (report, _) = LedgerValidator::validate_journal(&definition, &snapshot.receipts);
    Ok(report)
}

fn restore(path: &Path) -> anyhow::Result<TopicLedger> {
    let snapshot = load_snapshot(path)?;
    TopicLedger::restore(&snapshot).with_context(|| format!("restoring {}", path.display()))
}

/// Accepts an alias or a `pt:` prefixed hex identity.
fn resolve_participant(s: &str) -> anyhow::Result<ParticipantId> {
    if s.starts_with("pt:") {
        ParticipantId::from_hex(s).with_context(|| format!("invalid participant id {s}"))
    } else {
        Ok(ParticipantId::from_alias(s))
    }
}

fn emit(value: Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

// Amounts are strings in JSON output; they can exceed u64.
fn step_json(step: &Step) -> Value {
    let mut value = json!({
        "step": step.index,
        "participant": step.participant,
        "outcome": step.outcome,
        "amount": step.amount.to_string(),
        "height": step.height.get(),
        "accepted": step.result.is_ok(),
    });
    match &step.result {
        Ok(receipt) => {
            value["seq"] = json!(receipt.seq);
            value["receipt_hash"] = json!(hex::encode(receipt.receipt_hash));
        }
        Err(e) => value["error"] = json!(e),
    }
    value
}

fn summary_json(summary: &TopicSummary) -> Value {
    json!({
        "topic": summary.topic.to_hex(),
        "owner": summary.owner.to_hex(),
        "name": summary.name.to_string(),
        "deadline_block": summary.deadline_block.get(),
        "observed_at": summary.observed_at.get(),
        "status": summary.status.to_string(),
        "total_value": summary.total_value.to_string(),
        "participants": summary.participant_count,
        "deposits": summary.deposit_count,
        "head": summary.head,
        "leading_outcome": summary.leading_outcome(),
        "standings": summary.standings.iter().map(|s| json!({
            "outcome": s.index,
            "label": s.label.to_string(),
            "aggregate": s.aggregate.to_string(),
            "share_bps": s.share_bps,
        })).collect::<Vec<_>>(),
    })
}

fn print_summary(summary: &TopicSummary) {
    let status = if summary.status.is_open() {
        summary.status.to_string().green()
    } else {
        summary.status.to_string().red()
    };
    println!(
        "\nTopic {} ({})  deadline {}  {} at {}",
        summary.name.to_string().bold(),
        summary.topic.short_id().cyan(),
        summary.deadline_block,
        status,
        summary.observed_at
    );
    let leader = summary.leading_outcome();
    for s in &summary.standings {
        let marker = if leader == Some(s.index) { "*" } else { " " };
        println!(
            "  {}{:>3} {:<32} {:>12}  {:>6.2}%",
            marker,
            s.index,
            s.label.to_string(),
            s.aggregate.to_string(),
            f64::from(s.share_bps) / 100.0
        );
    }
    println!(
        "  Total {} from {} participant(s) over {} deposit(s)",
        summary.total_value.to_string().bold(),
        summary.participant_count,
        summary.deposit_count
    );
}

#[cfg(test)]
mod tests {
    use topic_ledger::TopicError;

    use super::*;

    const SCENARIO: &str = r#"
[topic]
owner = "alice"
name = "test"
outcomes = ["first", "second", "third"]
deadline_block = 1000

[fabric]
channel_capacity = 2

[chain]
start_height = 5

[[participants]]
alias = "x"
funds = 10

[[participants]]
alias = "y"
funds = 2

[[deposits]]
participant = "x"
outcome = 0
amount = 1
height = 10

[[deposits]]
participant = "y"
outcome = 0
amount = 2

[[deposits]]
participant = "x"
outcome = 3
amount = 1

[[deposits]]
participant = "y"
outcome = 1
amount = 1

[[deposits]]
participant = "x"
outcome = 2
amount = 4
height = 999

[[deposits]]
participant = "x"
outcome = 0
amount = 1
height = 1000
"#;

    fn scenario() -> ScenarioFile {
        ScenarioFile::from_toml_str(SCENARIO).unwrap()
    }

    #[test]
    fn simulation_records_accepted_and_rejected_steps() {
        let sim = simulate(&scenario()).unwrap();
        let accepted: Vec<bool> = sim.steps.iter().map(|s| s.result.is_ok()).collect();
        assert_eq!(accepted, vec![true, true, false, false, true, false]);

        assert_eq!(sim.steps[1].height, BlockHeight::new(10));
        assert_eq!(sim.steps[4].height, BlockHeight::new(999));
        assert!(sim.steps[2].result.as_ref().unwrap_err().contains("out of range"));
        assert!(sim.steps[3].result.as_ref().unwrap_err().contains("insufficient funds"));
        assert!(sim.steps[5].result.as_ref().unwrap_err().contains("window closed"));

        let ledger = sim.host.ledger();
        assert_eq!(ledger.outcome_aggregate(0).unwrap(), 3);
        assert_eq!(ledger.outcome_aggregate(2).unwrap(), 4);
        assert_eq!(sim.host.custody_balance().unwrap(), 7);
        assert_eq!(sim.host.vault().wallet_balance(&ParticipantId::from_alias("x")).unwrap(), 5);
    }

    #[test]
    fn draining_each_step_avoids_lag() {
        let sim = simulate(&scenario()).unwrap();
        assert_eq!(sim.events.len(), 3);
        assert_eq!(
            sim.events.iter().map(|e| e.seq).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn scenario_with_issues_is_not_run() {
        let mut s = scenario();
        s.deposits[0].participant = "nobody".into();
        let err = simulate(&s).err().unwrap();
        assert!(err.to_string().contains("unknown participant"));
    }

    #[test]
    fn snapshot_roundtrip_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topic.json");
        let sim = simulate(&scenario()).unwrap();
        write_snapshot(&sim.host.ledger().snapshot().unwrap(), &path).unwrap();

        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.receipts.len(), 3);
        assert!(verify_snapshot(&snapshot).unwrap().is_valid());

        let restored = restore(&path).unwrap();
        assert_eq!(
            restored.balance_sheet().unwrap(),
            sim.host.ledger().balance_sheet().unwrap()
        );
        cmd_verify(VerifyArgs { snapshot: path.clone() }, OutputFormat::Text).unwrap();
        cmd_summary(SummaryArgs { snapshot: path.clone(), height: None }, OutputFormat::Json).unwrap();
        cmd_balance(
            BalanceArgs {
                snapshot: path,
                participant: "x".into(),
                outcome: None,
            },
            OutputFormat::Text,
        )
        .unwrap();
    }

    #[test]
    fn tampered_snapshot_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topic.json");
        let mut snapshot = simulate(&scenario()).unwrap().host.ledger().snapshot().unwrap();
        snapshot.receipts[0].amount = 100;
        write_snapshot(&snapshot, &path).unwrap();

        assert!(!verify_snapshot(&load_snapshot(&path).unwrap()).unwrap().is_valid());
        assert!(cmd_verify(VerifyArgs { snapshot: path.clone() }, OutputFormat::Json).is_err());

        let err = match restore(&path) {
            Ok(_) => panic!("tampered snapshot restored"),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<TopicError>(),
            Some(TopicError::IntegrityViolation { seq: 1, .. })
        ));
    }

    #[test]
    fn balance_rejects_unknown_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topic.json");
        write_snapshot(&simulate(&scenario()).unwrap().host.ledger().snapshot().unwrap(), &path).unwrap();

        let result = cmd_balance(
            BalanceArgs {
                snapshot: path,
                participant: "x".into(),
                outcome: Some(7),
            },
            OutputFormat::Text,
        );
        assert!(result.is_err());
    }

    #[test]
    fn participants_resolve_by_alias_or_id() {
        let x = ParticipantId::from_alias("x");
        assert_eq!(resolve_participant("x").unwrap(), x);
        assert_eq!(resolve_participant(&format!("pt:{}", x.to_hex())).unwrap(), x);
        assert!(resolve_participant("pt:zz").is_err());
    }
}
