//! Text rendering of analysis and simulation results

use crate::efficiency::StageEfficiency;
use crate::ordering::sort_items;
use crate::stats::{SimulationOutcome, TrialStats};
use std::collections::BTreeMap;

pub fn render_best_stages(best: &BTreeMap<String, StageEfficiency>) -> String {
    let mut items: Vec<&String> = best.keys().collect();
    sort_items(&mut items);

    let mut out = String::from("=== Best Stage Per Item ===\n");
    for item in items {
        let choice = &best[item];
        out.push_str(&format!(
            "{:<12}  best: {:<12}  ({:.4} per stamina)\n",
            item,
            choice.stage.to_string(),
            choice.efficiency
        ));
    }
    out
}

pub fn render_simulation(outcome: &SimulationOutcome) -> String {
    let mut out = format!(
        "=== Simulation: {} ===\nRuns: {}\nStamina spent: {}\n",
        outcome.stage, outcome.runs, outcome.stamina_spent
    );

    if outcome.loot.is_empty() {
        out.push_str("No items dropped.\n");
        return out;
    }

    let mut items: Vec<&str> = outcome.loot.iter().map(|(item, _)| item).collect();
    sort_items(&mut items);

    out.push_str("Loot:\n");
    for item in items {
        out.push_str(&format!(
            "  - {:<15}: {:<5} ({:.4} per stamina)\n",
            item,
            outcome.loot.get(item),
            outcome.per_stamina(item)
        ));
    }
    out
}

pub fn render_trials(stats: &TrialStats) -> String {
    let mut out = format!(
        "=== Trials: {} ===\nTrials: {}\nRuns per trial: {}\nStamina per trial: {}\n",
        stats.stage, stats.trials, stats.runs_per_trial, stats.stamina_per_trial
    );

    let mut items: Vec<&String> = stats.items.keys().collect();
    sort_items(&mut items);

    for item in items {
        let s = &stats.items[item];
        out.push_str(&format!(
            "  - {:<15}: {:.2} ± {:.2} [{} - {}]  {:.4}/stamina (EV {:.4})\n",
            item, s.mean, s.std, s.min, s.max, s.mean_per_stamina, s.expected_per_stamina
        ));
    }
    out
}
