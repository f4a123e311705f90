use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Float,
    Date,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ColumnType::Float => "float",
            ColumnType::Date => "date",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    /// Rows may leave this column empty.
    pub nullable: bool,
}

/// Ordered column set a table is created with.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub columns: &'static [Column],
}

impl Schema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// `{"price_a": "float", ...}` as table hosts expect it.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .map(|c| (c.name.to_string(), serde_json::Value::String(c.kind.to_string())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

const fn float(name: &'static str) -> Column {
    Column { name, kind: ColumnType::Float, nullable: false }
}

/// Columns of the ratio table. Names match the serialized fields of
/// `AnalyticalRecord`.
pub static ANALYTICAL_SCHEMA: Schema = Schema {
    columns: &[
        float("price_a"),
        float("price_b"),
        float("ratio"),
        Column { name: "timestamp", kind: ColumnType::Date, nullable: false },
        float("upper_bound"),
        float("lower_bound"),
        Column { name: "alert_value", kind: ColumnType::Float, nullable: true },
    ],
};
