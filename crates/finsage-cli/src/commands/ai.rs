//! AI backend command implementations

use anyhow::Result;
use finsage_core::{AIBackend, BudgetRequest, FinanceEngine, Source};

use super::ledger::{money, source_label};

/// Check the configured AI backend and push one budget request through the engine
pub async fn cmd_ai_test(engine: &FinanceEngine) -> Result<()> {
    println!("🔍 Testing AI backend...\n");

    let Some(client) = engine.ai() else {
        println!("  ⚠️  No AI backend configured (or --offline given)");
        println!();
        println!("  Set one of:");
        println!("    GROQ_API_KEY                      Groq (default backend)");
        println!("    AI_BACKEND=openai_compatible      plus OPENAI_COMPATIBLE_HOST");
        println!("    AI_BACKEND=ollama                 plus OLLAMA_HOST");
        println!();
        println!("  All results will come from the deterministic rules.");
        return Ok(());
    };

    let info = client.router_info();
    println!("  Backend: {}", client.kind());
    println!("  Host: {}", client.host());
    println!("  Default model: {}", info.default_model);
    for (task, model) in &info.task_models {
        println!("    {}: {}", task, model);
    }
    println!();

    print!("Checking availability... ");
    if client.health_check().await {
        println!("✅ Connected");
    } else {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach {}", client.host());
    }

    println!("\nRequesting a sample budget plan...");
    let request = BudgetRequest::new(50000.0, 10000.0);
    let plan = engine.generate_budget_plan(&request).await?;

    match plan.source {
        Source::Model { .. } => println!("  ✅ Model reply accepted"),
        Source::Fallback { ref reason } => println!("  ❌ Model path failed: {}", reason),
        Source::RuleBased => println!("  ℹ️  Rules only"),
    }
    println!("  Source: {}", source_label(&plan.source));
    for allocation in &plan.value {
        println!(
            "    {:<15} {:>14}",
            allocation.category.as_str(),
            money(allocation.allocated_amount)
        );
    }

    Ok(())
}
