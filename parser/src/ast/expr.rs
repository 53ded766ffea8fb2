use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use enquote::enquote;
use serde::{Deserialize, Serialize};

use promql_common::duration::fmt_duration_ms;

use crate::common::{are_floats_equal, join_vector, write_comma_separated, write_number, Operator};
use crate::label::{LabelFilter, LabelFilterOp, NAME_LABEL};
use crate::parser::{escape_ident, ParseError, ParseResult};

pub type BExpr = Box<Expr>;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NumberLiteral {
    pub value: f64,
}

impl NumberLiteral {
    pub fn new(v: f64) -> Self {
        NumberLiteral { value: v }
    }
}

impl PartialEq for NumberLiteral {
    fn eq(&self, other: &Self) -> bool {
        are_floats_equal(self.value, other.value)
    }
}

impl Eq for NumberLiteral {}

impl Display for NumberLiteral {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write_number(f, self.value)
    }
}

impl Deref for NumberLiteral {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringLiteral(pub String);

impl StringLiteral {
    pub fn new<S: Into<String>>(s: S) -> Self {
        StringLiteral(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for StringLiteral {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", enquote('"', &self.0))
    }
}

/// A duration, either in milliseconds or as a multiple of the query step (`5i`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum DurationExpr {
    Millis(i64),
    StepValue(f64),
}

impl DurationExpr {
    pub fn new(millis: i64) -> Self {
        DurationExpr::Millis(millis)
    }

    pub fn new_step(value: f64) -> Self {
        DurationExpr::StepValue(value)
    }
}

impl Display for DurationExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DurationExpr::Millis(v) => fmt_duration_ms(f, *v),
            DurationExpr::StepValue(v) => write!(f, "{v}i"),
        }
    }
}

impl PartialEq<DurationExpr> for DurationExpr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DurationExpr::Millis(v1), DurationExpr::Millis(v2)) => v1 == v2,
            (DurationExpr::StepValue(v1), DurationExpr::StepValue(v2)) => {
                are_floats_equal(*v1, *v2)
            }
            _ => false,
        }
    }
}

impl Eq for DurationExpr {}

/// MetricExpr represents MetricsQL metric with optional filters, i.e. `foo{...}`.
/// When present, the metric name is stored as the first filter (`__name__="foo"`).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricExpr {
    pub matchers: Vec<LabelFilter>,
}

impl MetricExpr {
    pub fn new<S: Into<String>>(name: S) -> MetricExpr {
        let name_filter = LabelFilter {
            op: LabelFilterOp::Equal,
            label: NAME_LABEL.to_string(),
            value: name.into(),
        };
        MetricExpr {
            matchers: vec![name_filter],
        }
    }

    pub fn with_filters(filters: Vec<LabelFilter>) -> Self {
        let mut me = MetricExpr { matchers: filters };
        // keep the name filter in front so it renders as the metric name
        if let Some(pos) = me.matchers.iter().position(|f| f.is_metric_name_filter()) {
            let name = me.matchers.remove(pos);
            me.matchers.insert(0, name);
        }
        me
    }

    pub fn append(mut self, filter: LabelFilter) -> Self {
        self.matchers.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn metric_name(&self) -> Option<&str> {
        self.matchers
            .first()
            .filter(|f| f.is_metric_name_filter())
            .map(|f| f.value.as_str())
    }

    pub fn is_only_metric_name(&self) -> bool {
        self.matchers.len() == 1 && self.metric_name().is_some()
    }
}

impl Display for MetricExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }

        let mut offset = 0;
        if let Some(metric_name) = self.metric_name() {
            write!(f, "{}", escape_ident(metric_name))?;
            offset = 1;
        }

        if self.is_only_metric_name() {
            return Ok(());
        }
        write!(f, "{{{}}}", join_vector(&self.matchers[offset..], ", ", false))
    }
}

impl From<&str> for MetricExpr {
    fn from(name: &str) -> Self {
        MetricExpr::new(name)
    }
}

/// RollupExpr represents an expression which contains at least `offset` or `[...]` part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupExpr {
    /// The expression for the rollup. Usually it is MetricExpr, but may be arbitrary expr
    /// if subquery is used.
    pub expr: BExpr,

    /// window contains optional window value from square brackets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<DurationExpr>,

    /// step contains optional step value from square brackets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<DurationExpr>,

    /// offset contains optional value from `offset` part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<DurationExpr>,

    /// if set to true, then `foo[1h:]` would print the same
    /// instead of `foo[1h]`.
    #[serde(default)]
    pub inherit_step: bool,

    /// at contains an optional expression after `@` modifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<BExpr>,
}

impl RollupExpr {
    pub fn new(expr: Expr) -> Self {
        RollupExpr {
            expr: Box::new(expr),
            window: None,
            step: None,
            offset: None,
            inherit_step: false,
            at: None,
        }
    }

    pub fn with_window(mut self, window: DurationExpr) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_step(mut self, step: DurationExpr) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_offset(mut self, offset: DurationExpr) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_inherit_step(mut self, inherit_step: bool) -> Self {
        self.inherit_step = inherit_step;
        self
    }

    pub fn with_at(mut self, at: Expr) -> Self {
        self.at = Some(Box::new(at));
        self
    }

    pub fn for_subquery(&self) -> bool {
        self.step.is_some() || self.inherit_step
    }

    fn fmt_time_suffix(&self, f: &mut Formatter) -> fmt::Result {
        if self.window.is_some() || self.for_subquery() {
            write!(f, "[")?;
            if let Some(win) = &self.window {
                write!(f, "{}", win)?;
            }
            if let Some(step) = &self.step {
                write!(f, ":{}", step)?;
            } else if self.inherit_step {
                write!(f, ":")?;
            }
            write!(f, "]")?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " offset {}", offset)?;
        }
        if let Some(at) = &self.at {
            if matches!(at.as_ref(), Expr::BinaryOperator(_)) {
                write!(f, " @ ({})", at)?;
            } else {
                write!(f, " @ {}", at)?;
            }
        }
        Ok(())
    }
}

impl Display for RollupExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let need_parens = match self.expr.as_ref() {
            Expr::Rollup(_) => true,
            Expr::BinaryOperator(_) => true,
            Expr::Aggregation(ae) => ae.modifier.is_some(),
            _ => false,
        };
        if need_parens {
            write!(f, "({})", self.expr)?;
        } else {
            write!(f, "{}", self.expr)?;
        }
        self.fmt_time_suffix(f)
    }
}

/// FunctionExpr represents a call such as `rate(...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub name: String,

    pub args: Vec<Expr>,

    /// If set to true, then the function should keep metric names.
    #[serde(default)]
    pub keep_metric_names: bool,
}

impl FunctionExpr {
    /// An empty name denotes the implicit `union` of a parenthesized list.
    pub fn new(name: &str, args: Vec<Expr>) -> Self {
        let name = if name.is_empty() { "union" } else { name };
        FunctionExpr {
            name: name.to_string(),
            args,
            keep_metric_names: false,
        }
    }

    pub fn with_keep_metric_names(mut self) -> Self {
        self.keep_metric_names = true;
        self
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl Display for FunctionExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        write_comma_separated(self.args.iter(), f, true)?;
        if self.keep_metric_names {
            write!(f, " keep_metric_names")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateModifier {
    /// The `by` modifier.
    By(Vec<String>),
    /// The `without` modifier.
    Without(Vec<String>),
}

impl Display for AggregateModifier {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            AggregateModifier::By(vec) => {
                write!(f, "by ")?;
                write_comma_separated(vec.iter(), f, true)?;
            }
            AggregateModifier::Without(vec) => {
                write!(f, "without ")?;
                write_comma_separated(vec.iter(), f, true)?;
            }
        }
        Ok(())
    }
}

/// AggregationExpr represents aggregate function such as `sum(...) by (...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationExpr {
    /// name is the aggregation function name.
    pub name: String,

    /// function args.
    pub args: Vec<Expr>,

    /// optional modifier such as `by (...)` or `without (...)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<AggregateModifier>,

    /// optional limit for the number of output time series.
    /// This is an MetricsQL extension.
    #[serde(default)]
    pub limit: usize,

    #[serde(default)]
    pub keep_metric_names: bool,
}

impl AggregationExpr {
    pub fn new(name: &str, args: Vec<Expr>) -> AggregationExpr {
        AggregationExpr {
            name: name.to_lowercase(),
            args,
            modifier: None,
            limit: 0,
            keep_metric_names: false,
        }
    }

    pub fn with_modifier(mut self, modifier: AggregateModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl Display for AggregationExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        write_comma_separated(self.args.iter(), f, true)?;
        if let Some(modifier) = &self.modifier {
            write!(f, " {}", modifier)?;
        }
        if self.limit > 0 {
            write!(f, " limit {}", self.limit)?;
        }
        if self.keep_metric_names {
            write!(f, " keep_metric_names")?;
        }
        Ok(())
    }
}

/// Label matching for binary operations on vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorMatchModifier {
    On(Vec<String>),
    Ignoring(Vec<String>),
}

#[derive(Debug, Clone, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum VectorMatchCardinality {
    #[default]
    OneToOne,
    /// on(labels)/ignoring(labels) GROUP_LEFT
    ManyToOne(Vec<String>),
    /// on(labels)/ignoring(labels) GROUP_RIGHT
    OneToMany(Vec<String>),
}

#[derive(Debug, Clone, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinModifier {
    pub card: VectorMatchCardinality,

    /// on/ignoring on labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching: Option<VectorMatchModifier>,

    /// If keep_metric_names is set to true, then the operation should keep metric names.
    #[serde(default)]
    pub keep_metric_names: bool,

    /// If a comparison operator, return 0/1 rather than filtering.
    /// For example, `foo > bool bar`.
    #[serde(default)]
    pub return_bool: bool,
}

impl BinModifier {
    pub fn with_card(mut self, card: VectorMatchCardinality) -> Self {
        self.card = card;
        self
    }

    pub fn with_matching(mut self, matching: Option<VectorMatchModifier>) -> Self {
        self.matching = matching;
        if self.matching.is_none() {
            self.card = VectorMatchCardinality::OneToOne;
        }
        self
    }

    pub fn with_return_bool(mut self, return_bool: bool) -> Self {
        self.return_bool = return_bool;
        self
    }

    pub fn with_keep_metric_names(mut self, keep_metric_names: bool) -> Self {
        self.keep_metric_names = keep_metric_names;
        self
    }

    pub fn is_default(&self) -> bool {
        self.card == VectorMatchCardinality::OneToOne
            && self.matching.is_none()
            && !self.keep_metric_names
            && !self.return_bool
    }
}

/// Everything but `keep_metric_names`, which wraps the whole operation.
impl Display for BinModifier {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.return_bool {
            write!(f, " bool")?;
        }
        if let Some(matching) = &self.matching {
            match matching {
                VectorMatchModifier::On(labels) => {
                    write!(f, " on")?;
                    write_comma_separated(labels.iter(), f, true)?;
                }
                VectorMatchModifier::Ignoring(labels) => {
                    write!(f, " ignoring")?;
                    write_comma_separated(labels.iter(), f, true)?;
                }
            }
        }
        match &self.card {
            VectorMatchCardinality::ManyToOne(labels) => {
                write!(f, " group_left")?;
                write_comma_separated(labels.iter(), f, true)?;
            }
            VectorMatchCardinality::OneToMany(labels) => {
                write!(f, " group_right")?;
                write_comma_separated(labels.iter(), f, true)?;
            }
            VectorMatchCardinality::OneToOne => {}
        }
        Ok(())
    }
}

/// BinaryExpr represents a binary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryExpr {
    /// left contains left arg for the `left op right` expression.
    pub left: BExpr,

    /// contains right arg for the `left op right` expression.
    pub right: BExpr,

    /// Op is the operation itself, i.e. `+`, `-`, `*`, etc.
    pub op: Operator,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<BinModifier>,
}

impl BinaryExpr {
    pub fn new(op: Operator, lhs: Expr, rhs: Expr) -> Self {
        BinaryExpr {
            op,
            left: Box::new(lhs),
            right: Box::new(rhs),
            modifier: None,
        }
    }

    pub fn with_modifier(mut self, modifier: BinModifier) -> Self {
        self.modifier = if modifier.is_default() {
            None
        } else {
            Some(modifier)
        };
        self
    }

    pub fn with_bool_modifier(mut self) -> ParseResult<Self> {
        if !self.op.is_comparison() {
            return Err(ParseError::General(format!(
                "bool modifier is only allowed for comparison operators; got {}",
                self.op
            )));
        }
        let modifier = self.modifier.take().unwrap_or_default();
        self.modifier = Some(modifier.with_return_bool(true));
        Ok(self)
    }

    /// indicates whether `bool` modifier is present.
    /// For example, `foo > bool bar`.
    pub fn returns_bool(&self) -> bool {
        matches!(&self.modifier, Some(modifier) if modifier.return_bool)
    }

    /// Determines if the result of the operation should keep metric names.
    pub fn keep_metric_names(&self) -> bool {
        matches!(&self.modifier, Some(modifier) if modifier.keep_metric_names)
    }

    fn fmt_no_keep_metric_name(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.left, self.op)?;
        if let Some(modifier) = &self.modifier {
            write!(f, "{}", modifier)?;
        }
        write!(f, " {}", self.right)
    }
}

impl Display for BinaryExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.keep_metric_names() {
            write!(f, "(")?;
            self.fmt_no_keep_metric_name(f)?;
            write!(f, ") keep_metric_names")
        } else {
            self.fmt_no_keep_metric_name(f)
        }
    }
}

/// UnaryExpr will negate the expr
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub expr: BExpr,
}

impl UnaryExpr {
    pub fn new(expr: Expr) -> Self {
        UnaryExpr {
            expr: Box::new(expr),
        }
    }
}

impl Display for UnaryExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.expr.as_ref() {
            Expr::BinaryOperator(_) => write!(f, "-({})", self.expr),
            _ => write!(f, "-{}", self.expr),
        }
    }
}

/// Expression(s) explicitly grouped in parens
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParensExpr {
    pub expressions: Vec<Expr>,
}

impl ParensExpr {
    pub fn new(expressions: Vec<Expr>) -> Self {
        ParensExpr { expressions }
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Return the innermost expression wrapped by a `ParensExpr` if the `ParensExpr` contains
    /// exactly one expression. For example : (((x + y))) would return a ref to `x + y`
    pub fn innermost_expr(&self) -> Option<&Expr> {
        match self.expressions.as_slice() {
            [Expr::Parens(inner)] => inner.innermost_expr(),
            [expr] => Some(expr),
            _ => None,
        }
    }
}

impl Display for ParensExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write_comma_separated(self.expressions.iter(), f, true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Aggregation(AggregationExpr),
    BinaryOperator(BinaryExpr),
    Duration(DurationExpr),
    Function(FunctionExpr),
    MetricExpression(MetricExpr),
    NumberLiteral(NumberLiteral),
    Parens(ParensExpr),
    Rollup(RollupExpr),
    StringLiteral(StringLiteral),
    UnaryOperator(UnaryExpr),
}

impl Expr {
    pub fn number(v: f64) -> Expr {
        Expr::NumberLiteral(NumberLiteral::new(v))
    }

    pub fn string_literal<S: Into<String>>(s: S) -> Expr {
        Expr::StringLiteral(StringLiteral::new(s))
    }

    pub fn metric<S: Into<String>>(name: S) -> Expr {
        Expr::MetricExpression(MetricExpr::new(name))
    }

    /// Builds a function call node.
    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Function(FunctionExpr::new(name, args))
    }

    /// Returns true when this node is a call to `name` (case-insensitive).
    /// Aggregations and parenthesized calls are not considered.
    pub fn is_function_named(&self, name: &str) -> bool {
        matches!(self, Expr::Function(fe) if fe.is_named(name))
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Expr::Aggregation(a) => write!(f, "{}", a),
            Expr::UnaryOperator(ue) => write!(f, "{}", ue),
            Expr::BinaryOperator(be) => write!(f, "{}", be),
            Expr::Duration(d) => write!(f, "{}", d),
            Expr::Function(func) => write!(f, "{}", func),
            Expr::NumberLiteral(n) => write!(f, "{}", n),
            Expr::MetricExpression(me) => write!(f, "{}", me),
            Expr::Parens(p) => write!(f, "{}", p),
            Expr::Rollup(re) => write!(f, "{}", re),
            Expr::StringLiteral(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::number(v)
    }
}

impl From<MetricExpr> for Expr {
    fn from(me: MetricExpr) -> Self {
        Expr::MetricExpression(me)
    }
}

impl From<RollupExpr> for Expr {
    fn from(re: RollupExpr) -> Self {
        Expr::Rollup(re)
    }
}

impl From<FunctionExpr> for Expr {
    fn from(fe: FunctionExpr) -> Self {
        Expr::Function(fe)
    }
}

impl From<AggregationExpr> for Expr {
    fn from(ae: AggregationExpr) -> Self {
        Expr::Aggregation(ae)
    }
}

impl From<BinaryExpr> for Expr {
    fn from(be: BinaryExpr) -> Self {
        Expr::BinaryOperator(be)
    }
}
