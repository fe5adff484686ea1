// src/bcp/schema.rs

/// One logical table of the Charity Commission extract and its CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl TableSchema {
    /// Archive member holding this table, e.g. `extract_trustee.bcp`.
    pub fn member_name(&self) -> String {
        format!("{}.bcp", self.name)
    }

    /// Output file written for this table, e.g. `extract_trustee.csv`.
    pub fn csv_name(&self) -> String {
        format!("{}.csv", self.name)
    }
}

/// Every table the extract is known to contain, in declaration order.
/// Headers are fixed by downstream consumers and never inferred from data.
pub static TABLES: &[TableSchema] = &[
    TableSchema {
        name: "extract_acct_submit",
        columns: &["regno", "submit_date", "arno", "fyend"],
    },
    TableSchema {
        name: "extract_aoo_ref",
        columns: &["aootype", "aookey", "aooname", "aoosort", "welsh", "master"],
    },
    TableSchema {
        name: "extract_ar_submit",
        columns: &["regno", "arno", "submit_date"],
    },
    TableSchema {
        name: "extract_charity",
        columns: &[
            "regno",
            "subno",
            "name",
            "orgtype",
            "gd",
            "aob",
            "aob_defined",
            "nhs",
            "ha_no",
            "corr",
            "add1",
            "add2",
            "add3",
            "add4",
            "add5",
            "postcode",
            "phone",
            "fax",
        ],
    },
    TableSchema {
        name: "extract_charity_aoo",
        columns: &["regno", "aootype", "aookey", "welsh", "master"],
    },
    TableSchema {
        name: "extract_class",
        columns: &["regno", "class"],
    },
    TableSchema {
        name: "extract_class_ref",
        columns: &["classno", "classtext"],
    },
    TableSchema {
        name: "extract_financial",
        columns: &["regno", "fystart", "fyend", "income", "expend"],
    },
    TableSchema {
        name: "extract_main_charity",
        columns: &[
            "regno",
            "coyno",
            "trustees",
            "fyend",
            "welsh",
            "incomedate",
            "income",
            "grouptype",
            "email",
            "web",
        ],
    },
    TableSchema {
        name: "extract_name",
        columns: &["regno", "subno", "nameno", "name"],
    },
    TableSchema {
        name: "extract_objects",
        columns: &["regno", "subno", "seqno", "object"],
    },
    TableSchema {
        name: "extract_partb",
        columns: &[
            "regno",
            "artype",
            "fystart",
            "fyend",
            "inc_leg",
            "inc_end",
            "inc_vol",
            "inc_fr",
            "inc_char",
            "inc_invest",
            "inc_other",
            "inc_total",
            "invest_gain",
            "asset_gain",
            "pension_gain",
            "exp_vol",
            "exp_trade",
            "exp_invest",
            "exp_grant",
            "exp_charble",
            "exp_gov",
            "exp_other",
            "exp_total",
            "exp_support",
            "exp_dep",
            "reserves",
            "asset_open",
            "asset_close",
            "fixed_assets",
            "open_assets",
            "invest_assets",
            "cash_assets",
            "current_assets",
            "credit_1",
            "credit_long",
            "pension_assets",
            "total_assets",
            "funds_end",
            "funds_restrict",
            "funds_unrestrict",
            "funds_total",
            "employees",
            "volunteers",
            "cons_acc",
            "charity_acc",
        ],
    },
    TableSchema {
        name: "extract_registration",
        columns: &["regno", "subno", "regdate", "remdate", "remcode"],
    },
    TableSchema {
        name: "extract_remove_ref",
        columns: &["code", "text"],
    },
    TableSchema {
        name: "extract_trustee",
        columns: &["regno", "trustee"],
    },
];

/// Look up a table by name.
pub fn lookup(name: &str) -> Option<&'static TableSchema> {
    TABLES.iter().find(|t| t.name == name)
}
