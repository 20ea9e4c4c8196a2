use crate::ledger::{AccountSnapshot, TokenStandard};
use alloy_primitives::U256;
use alloy_primitives::utils::{format_ether, format_units};
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

pub fn format_snapshot(snapshot: &AccountSnapshot, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_snapshot_table(snapshot),
        OutputFormat::Json => format_snapshot_json(snapshot),
        OutputFormat::Csv => format_snapshot_csv(snapshot),
    }
}

fn format_token_balance(balance: Option<U256>, decimals: Option<u64>) -> String {
    let Some(balance) = balance else {
        return "N/A".to_string();
    };
    match decimals.and_then(|d| u8::try_from(d).ok()) {
        Some(decimals) => {
            format_units(balance, decimals).unwrap_or_else(|_| balance.to_string())
        }
        None => balance.to_string(),
    }
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or("N/A".to_string(), |v| v.to_string())
}

fn format_snapshot_table(snapshot: &AccountSnapshot) -> String {
    let mut sections = Vec::new();

    let mut overview = Table::new();
    overview
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Metric", "Value"]);
    overview.add_row(vec![Cell::new("Address"), Cell::new(snapshot.address)]);
    overview.add_row(vec![
        Cell::new("Block"),
        Cell::new(or_na(snapshot.block_number)),
    ]);
    overview.add_row(vec![
        Cell::new("Balance (ETH)"),
        Cell::new(snapshot.balance.map_or("N/A".to_string(), format_ether)),
    ]);
    overview.add_row(vec![
        Cell::new("Transactions"),
        Cell::new(or_na(snapshot.transaction_count)),
    ]);
    sections.push(overview.to_string());

    if snapshot.erc20_tokens.is_empty() {
        sections.push("No ERC-20 tokens found.".to_string());
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Token", "Name", "Symbol", "Balance", "Balance (Raw)"]);
        for (contract, ledger) in &snapshot.erc20_tokens {
            table.add_row(vec![
                Cell::new(format!("{contract:#}")),
                Cell::new(ledger.name.as_deref().unwrap_or("N/A")),
                Cell::new(ledger.symbol.as_deref().unwrap_or("N/A")),
                Cell::new(format_token_balance(ledger.balance, ledger.decimals)),
                Cell::new(or_na(ledger.balance)),
            ]);
        }
        sections.push(table.to_string());
    }

    if snapshot.erc721_tokens.is_empty() {
        sections.push("No ERC-721 tokens found.".to_string());
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Token", "Name", "Symbol", "Token Id", "Token URI"]);
        for (contract, ledger) in &snapshot.erc721_tokens {
            for token in &ledger.tokens {
                table.add_row(vec![
                    Cell::new(format!("{contract:#}")),
                    Cell::new(ledger.name.as_deref().unwrap_or("N/A")),
                    Cell::new(ledger.symbol.as_deref().unwrap_or("N/A")),
                    Cell::new(format!("{:#x}", token.token_id)),
                    Cell::new(token.token_uri.as_deref().unwrap_or("N/A")),
                ]);
            }
        }
        sections.push(table.to_string());
    }

    if !snapshot.errors.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec!["Operation", "Message"]);
        for error in &snapshot.errors {
            table.add_row(vec![Cell::new(&error.operation), Cell::new(&error.message)]);
        }
        sections.push(table.to_string());
    }

    sections.join("\n")
}

fn format_snapshot_json(snapshot: &AccountSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
}

fn format_snapshot_csv(snapshot: &AccountSnapshot) -> String {
    let mut wtr = Writer::from_writer(vec![]);

    let _ = wtr.write_record([
        "standard", "contract", "name", "symbol", "balance", "token_id", "token_uri",
    ]);

    let erc20 = TokenStandard::Erc20.to_string();
    for (contract, ledger) in &snapshot.erc20_tokens {
        let _ = wtr.write_record([
            erc20.as_str(),
            &format!("{contract:?}"),
            ledger.name.as_deref().unwrap_or(""),
            ledger.symbol.as_deref().unwrap_or(""),
            &ledger.balance.map(|b| b.to_string()).unwrap_or_default(),
            "",
            "",
        ]);
    }

    let erc721 = TokenStandard::Erc721.to_string();
    for (contract, ledger) in &snapshot.erc721_tokens {
        for token in &ledger.tokens {
            let _ = wtr.write_record([
                erc721.as_str(),
                &format!("{contract:?}"),
                ledger.name.as_deref().unwrap_or(""),
                ledger.symbol.as_deref().unwrap_or(""),
                "1",
                &format!("{:#x}", token.token_id),
                token.token_uri.as_deref().unwrap_or(""),
            ]);
        }
    }

    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}
