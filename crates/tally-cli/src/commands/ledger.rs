//! Transaction command implementations

use anyhow::Result;
use tally_core::db::Database;
use tally_core::models::TransactionKind;

use super::truncate;

pub fn cmd_transactions_list(db: &Database, owner: &str, limit: i64) -> Result<()> {
    let transactions = db.list_recent_transactions(owner, limit)?;

    if transactions.is_empty() {
        println!("No transactions found for {}. Record one by chatting:", owner);
        println!("  \"spent 45 on groceries\"");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions ({})", owner);
    println!("   ─────────────────────────────────────────────────────────────");

    for tx in transactions {
        let amount_str = match tx.kind {
            TransactionKind::Expense => format!("\x1b[31m-${:.2}\x1b[0m", tx.amount),
            TransactionKind::Income => format!("\x1b[32m+${:.2}\x1b[0m", tx.amount),
        };

        println!(
            "   #{:<4} {} │ {:>10} │ {:<10} │ {}",
            tx.id,
            tx.occurred_at.format("%Y-%m-%d"),
            amount_str,
            truncate(&tx.category, 10),
            truncate(&tx.description, 40)
        );
    }

    Ok(())
}

pub fn cmd_transactions_delete(db: &Database, owner: &str, id: i64) -> Result<()> {
    db.delete_transaction(owner, id)?;
    println!("🗑️  Deleted transaction #{}", id);
    Ok(())
}
