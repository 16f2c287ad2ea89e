//! # Operator Commands
//!
//! Line-oriented command language typed at the terminal prompt.
//!
//! ## Command Reference
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Command                          Example                               │
//! │  ───────                          ───────                               │
//! │  add <product> [variant]          add 2          add 1 1-3              │
//! │  pick <product> <attr>=<value>..  pick 1 color=Red size=S               │
//! │  qty <line> <+n|-n>               qty 1/1-1 +1   qty 2 -1               │
//! │  rm <line>                        rm 1/1-1                              │
//! │  clear                                                                  │
//! │  total                                                                  │
//! │  pay <amount> [cash|card]         pay 50         pay 43.98 card         │
//! │  pend [note...]                   pend customer went to ATM             │
//! │  pending                                                                │
//! │  resume <id> [--pend]             resume 3f2a    resume 3f2a --pend     │
//! │  search <text>                    search milk                           │
//! │  report [range]                   report week    report 2024-01-01..2024-01-31
//! │  stock <line> <n>                 stock 1/1-3 40                        │
//! │  reorder <product> <n>            reorder 2 15                          │
//! │  low [threshold]                  low            low 25                 │
//! │  expiring [YYYY-MM-DD]            expiring       expiring 2024-01-31    │
//! │  help | quit                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `<line>` is `product` or `product/variant`, as printed in the cart.

use chrono::NaiveDate;
use tally_core::report::ReportRange;
use tally_core::{ItemKey, PaymentMethod};

use crate::error::{TerminalError, TerminalResult};

/// One parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add {
        product_id: String,
        variant_id: Option<String>,
    },
    Pick {
        product_id: String,
        choices: Vec<(String, String)>,
    },
    Qty {
        key: ItemKey,
        delta: i64,
    },
    Remove {
        key: ItemKey,
    },
    Clear,
    Total,
    Pay {
        tender: String,
        method: PaymentMethod,
    },
    Pend {
        note: Option<String>,
    },
    Pending,
    Resume {
        id: String,
        pend_current: bool,
    },
    Search {
        query: String,
    },
    Report {
        range: ReportRange,
    },
    /// Overwrite one stock record after a delivery or recount.
    Stock {
        key: ItemKey,
        quantity: i64,
    },
    Reorder {
        product_id: String,
        level: i64,
    },
    /// Units at or below `threshold`, or at or below their own reorder
    /// point when none is given.
    Low {
        threshold: Option<i64>,
    },
    /// Products expiring on or before the date (today when absent).
    Expiring {
        date: Option<NaiveDate>,
    },
    Help,
    Quit,
}

pub const HELP: &str = "\
add <product> [variant]         add one unit
pick <product> <attr>=<value>   choose variant attributes
qty <line> <+n|-n>              change a line's quantity
rm <line>                       remove a line
clear                           empty the cart
total                           show subtotal, tax and total
pay <amount> [cash|card]        settle and record the sale
pend [note]                     park the cart
pending                         list parked carts
resume <id> [--pend]            restore a parked cart
search <text>                   find products
report [today|week|month|year|all|Nd|FROM..TO]
stock <line> <n>                set a stock level
reorder <product> <n>           set a product's reorder point
low [threshold]                 units that need restocking
expiring [YYYY-MM-DD]           products expiring by a date
quit";

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> TerminalResult<Option<Command>> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match verb.to_lowercase().as_str() {
            "add" => match args.as_slice() {
                [product] => Command::Add {
                    product_id: product.to_string(),
                    variant_id: None,
                },
                [product, variant] => Command::Add {
                    product_id: product.to_string(),
                    variant_id: Some(variant.to_string()),
                },
                _ => return Err(usage("add <product> [variant]")),
            },

            "pick" => {
                let [product, pairs @ ..] = args.as_slice() else {
                    return Err(usage("pick <product> <attr>=<value>..."));
                };
                if pairs.is_empty() {
                    return Err(usage("pick <product> <attr>=<value>..."));
                }
                let choices = pairs
                    .iter()
                    .map(|pair| {
                        pair.split_once('=')
                            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .ok_or_else(|| {
                                TerminalError::validation(format!(
                                    "expected <attr>=<value>, got '{pair}'"
                                ))
                            })
                    })
                    .collect::<TerminalResult<Vec<_>>>()?;
                Command::Pick {
                    product_id: product.to_string(),
                    choices,
                }
            }

            "qty" => match args.as_slice() {
                [line, delta] => Command::Qty {
                    key: parse_key(line),
                    delta: parse_delta(delta)?,
                },
                _ => return Err(usage("qty <line> <+n|-n>")),
            },

            "rm" | "remove" => match args.as_slice() {
                [line] => Command::Remove {
                    key: parse_key(line),
                },
                _ => return Err(usage("rm <line>")),
            },

            "clear" => Command::Clear,
            "total" | "totals" => Command::Total,

            "pay" => match args.as_slice() {
                [amount] => Command::Pay {
                    tender: amount.to_string(),
                    method: PaymentMethod::Cash,
                },
                [amount, method] => Command::Pay {
                    tender: amount.to_string(),
                    method: PaymentMethod::parse(method).ok_or_else(|| {
                        TerminalError::validation(format!("unknown payment method '{method}'"))
                    })?,
                },
                _ => return Err(usage("pay <amount> [cash|card]")),
            },

            "pend" | "hold" => Command::Pend {
                note: (!args.is_empty()).then(|| args.join(" ")),
            },
            "pending" => Command::Pending,

            "resume" => match args.as_slice() {
                [id] => Command::Resume {
                    id: id.to_string(),
                    pend_current: false,
                },
                [id, "--pend"] | ["--pend", id] => Command::Resume {
                    id: id.to_string(),
                    pend_current: true,
                },
                _ => return Err(usage("resume <id> [--pend]")),
            },

            "search" | "find" => {
                if args.is_empty() {
                    return Err(usage("search <text>"));
                }
                Command::Search {
                    query: args.join(" "),
                }
            }

            "report" => {
                let input = args.join(" ");
                let range = ReportRange::parse(&input).ok_or_else(|| {
                    TerminalError::validation(format!("unknown report range '{input}'"))
                })?;
                Command::Report { range }
            }

            "stock" => match args.as_slice() {
                [line, quantity] => Command::Stock {
                    key: parse_key(line),
                    quantity: parse_count(quantity)?,
                },
                _ => return Err(usage("stock <line> <n>")),
            },

            "reorder" => match args.as_slice() {
                [product, level] => Command::Reorder {
                    product_id: product.to_string(),
                    level: parse_count(level)?,
                },
                _ => return Err(usage("reorder <product> <n>")),
            },

            "low" => match args.as_slice() {
                [] => Command::Low { threshold: None },
                [threshold] => Command::Low {
                    threshold: Some(parse_count(threshold)?),
                },
                _ => return Err(usage("low [threshold]")),
            },

            "expiring" => match args.as_slice() {
                [] => Command::Expiring { date: None },
                [date] => Command::Expiring {
                    date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                        TerminalError::validation(format!("'{date}' is not a YYYY-MM-DD date"))
                    })?),
                },
                _ => return Err(usage("expiring [YYYY-MM-DD]")),
            },

            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,

            other => {
                return Err(TerminalError::unknown_command(format!(
                    "unknown command '{other}' (type 'help')"
                )))
            }
        };

        Ok(Some(command))
    }
}

fn usage(form: &str) -> TerminalError {
    TerminalError::validation(format!("usage: {form}"))
}

/// "1/1-2" → product 1, variant 1-2; "2" → product 2.
fn parse_key(input: &str) -> ItemKey {
    match input.split_once('/') {
        Some((product, variant)) => ItemKey::variant(product, variant),
        None => ItemKey::product(input),
    }
}

fn parse_delta(input: &str) -> TerminalResult<i64> {
    input
        .strip_prefix('+')
        .unwrap_or(input)
        .parse()
        .map_err(|_| TerminalError::validation(format!("'{input}' is not a quantity change")))
}

/// A non-negative whole number of units.
fn parse_count(input: &str) -> TerminalResult<i64> {
    input
        .parse()
        .ok()
        .filter(|n: &i64| *n >= 0)
        .ok_or_else(|| TerminalError::validation(format!("'{input}' is not a unit count")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_add_and_pick() {
        assert_eq!(
            parse("add 1 1-3"),
            Command::Add {
                product_id: "1".to_string(),
                variant_id: Some("1-3".to_string()),
            }
        );
        assert_eq!(
            parse("PICK 1 color=Red size=S"),
            Command::Pick {
                product_id: "1".to_string(),
                choices: vec![
                    ("color".to_string(), "Red".to_string()),
                    ("size".to_string(), "S".to_string()),
                ],
            }
        );
        assert!(Command::parse("pick 1 color").is_err());
        assert!(Command::parse("pick 1").is_err());
    }

    #[test]
    fn test_quantity_lines() {
        assert_eq!(
            parse("qty 1/1-1 +2"),
            Command::Qty {
                key: ItemKey::variant("1", "1-1"),
                delta: 2,
            }
        );
        assert_eq!(
            parse("qty 2 -1"),
            Command::Qty {
                key: ItemKey::product("2"),
                delta: -1,
            }
        );
        assert!(Command::parse("qty 2 lots").is_err());
    }

    #[test]
    fn test_pay() {
        assert_eq!(
            parse("pay 50"),
            Command::Pay {
                tender: "50".to_string(),
                method: PaymentMethod::Cash,
            }
        );
        assert_eq!(
            parse("pay 43.98 credit"),
            Command::Pay {
                tender: "43.98".to_string(),
                method: PaymentMethod::Card,
            }
        );
        assert!(Command::parse("pay 10 cheque").is_err());
    }

    #[test]
    fn test_pend_and_resume() {
        assert_eq!(parse("pend"), Command::Pend { note: None });
        assert_eq!(
            parse("pend back in 5"),
            Command::Pend {
                note: Some("back in 5".to_string()),
            }
        );
        assert_eq!(
            parse("resume 3f2a --pend"),
            Command::Resume {
                id: "3f2a".to_string(),
                pend_current: true,
            }
        );
    }

    #[test]
    fn test_report_ranges() {
        assert_eq!(
            parse("report"),
            Command::Report {
                range: ReportRange::Today,
            }
        );
        assert_eq!(
            parse("report week"),
            Command::Report {
                range: ReportRange::LastDays(7),
            }
        );
        assert!(Command::parse("report fortnight").is_err());
    }

    #[test]
    fn test_inventory_commands() {
        assert_eq!(
            parse("stock 1/1-3 40"),
            Command::Stock {
                key: ItemKey::variant("1", "1-3"),
                quantity: 40,
            }
        );
        assert_eq!(
            parse("reorder 2 15"),
            Command::Reorder {
                product_id: "2".to_string(),
                level: 15,
            }
        );
        assert_eq!(parse("low"), Command::Low { threshold: None });
        assert_eq!(parse("low 25"), Command::Low { threshold: Some(25) });
        assert_eq!(parse("expiring"), Command::Expiring { date: None });
        assert_eq!(
            parse("expiring 2024-01-31"),
            Command::Expiring {
                date: NaiveDate::from_ymd_opt(2024, 1, 31),
            }
        );

        assert!(Command::parse("stock 2 -1").is_err());
        assert!(Command::parse("stock 2").is_err());
        assert!(Command::parse("reorder 2 some").is_err());
        assert!(Command::parse("expiring 31/01/2024").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = Command::parse("refund 12").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownCommand);
    }
}
