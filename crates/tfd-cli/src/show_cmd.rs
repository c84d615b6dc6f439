//! `tfd show-plan` command: parse an existing plan file and print it.

use std::path::Path;

use anyhow::{Context, Result};

use tfd_core::Plan;
use tfd_core::plan::read_plan_file;

/// Run the show-plan command.
pub async fn run_show_plan(file: &Path, json: bool) -> Result<()> {
    let plan = read_plan_file(file)
        .await?
        .with_context(|| format!("plan file {} not found", file.display()))?;

    print_plan(&plan, json)
}

/// Print a plan either as JSON or in TFD's own line format.
pub fn print_plan(plan: &Plan, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(plan).context("failed to serialize plan")?;
        println!("{out}");
        return Ok(());
    }

    if plan.is_empty() {
        println!("Plan is empty.");
        return Ok(());
    }

    print!("{}", render_plan(plan));
    println!();
    println!("{} actions, makespan {:.3}", plan.len(), plan.makespan());
    Ok(())
}

/// Render a plan back into `<time>: (<action>) [<duration>]` lines.
pub fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    for item in plan.iter() {
        out.push_str(&format!(
            "{:.3}: ({}) [{:.3}]\n",
            item.time, item.action, item.duration
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfd_core::PlanItem;
    use tfd_core::plan::parse_plan;

    #[test]
    fn rendered_plan_parses_back() {
        let plan = Plan::new(vec![
            PlanItem::new(0.0, "pick-up a", 1.5),
            PlanItem::new(1.5, "stack a b", 1.0),
        ]);

        let text = render_plan(&plan);
        assert_eq!(text, "0.000: (pick-up a) [1.500]\n1.500: (stack a b) [1.000]\n");
        assert_eq!(parse_plan(&text).unwrap(), plan);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = run_show_plan(&tmp.path().join("pddlplan.1"), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pddlplan.1");
        std::fs::write(&path, "garbage\n").unwrap();

        let err = run_show_plan(&path, true).await.unwrap_err();
        assert!(err.to_string().contains("line 1"), "unexpected error: {err}");
    }
}
