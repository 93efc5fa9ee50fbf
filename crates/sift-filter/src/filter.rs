//! The filter façade: one `accept` contract over both filter variants.
//!
//! A [`Filter`] is the per-reader/per-writer live instance produced from a
//! [`ContentFilter`] description. The expression variant owns the parsed
//! expression (parameter-keyed, kept for cheap re-binding), the optimized
//! expression (variable-keyed), the reduced topic descriptor naming only the
//! fields the expression references, and the key codec over that reduced
//! layout. The function variant owns a callback and its opaque argument.
//!
//! Accept calls take `&mut self`: binding sample fields writes into the
//! instance's slot table, and instances are not reentrant — the host
//! serializes sample delivery per reader/writer, so this is the honest
//! signature, not a restriction.

use crate::codec::KeyCodec;
use crate::description::{
    ContentFilter, ExpressionFilter, FilterArg, FilterFn, FilterParam, FunctionFilter,
};
use crate::descriptor::TopicDescriptor;
use crate::error::FilterError;
use crate::sample::{DecodedSample, FieldValue, SampleInfo, SampleView};
use sift_expr::Expr;
use tracing::{debug, trace};

/// Identifier of the domain a filter's reader/writer lives in.
pub type DomainId = u32;

/// A live content filter.
#[derive(Clone, Debug)]
pub enum Filter {
    Expression(ExpressionInstance),
    Function(FunctionInstance),
}

impl Filter {
    /// Creates a filter instance from a description and the topic type of
    /// the entity it will be attached to.
    ///
    /// On error nothing is installed; a reader/writer without a filter
    /// accepts everything (see [`reader_accept`]/[`writer_accept`]).
    pub fn create(
        domain_id: DomainId,
        description: &ContentFilter,
        topic: &TopicDescriptor,
    ) -> Result<Filter, FilterError> {
        match description {
            ContentFilter::Expression(desc) => Ok(Filter::Expression(
                ExpressionInstance::create(domain_id, desc, topic)?,
            )),
            ContentFilter::Function(desc) => Ok(Filter::Function(FunctionInstance::create(
                domain_id, desc, topic,
            )?)),
        }
    }

    /// Decides a serialized sample on the reader side.
    pub fn reader_accept(&mut self, data: &[u8], info: &SampleInfo) -> bool {
        match self {
            Filter::Expression(inst) => inst.reader_accept(data),
            Filter::Function(inst) => inst.reader_accept(data, info),
        }
    }

    /// Decides a native sample on the writer side.
    pub fn writer_accept(&mut self, sample: &dyn SampleView) -> bool {
        match self {
            Filter::Expression(inst) => inst.writer_accept(sample),
            Filter::Function(inst) => inst.writer_accept(sample),
        }
    }

    /// Replaces this filter's description.
    ///
    /// When the new description's expression text is byte-identical to the
    /// current one, only the parameters are re-bound and the optimized
    /// expression is rebuilt in place; likewise a function filter with the
    /// same callback only swaps its argument. Otherwise the instance is
    /// recreated. On error the previous filter stays in place.
    pub fn update(
        &mut self,
        description: &ContentFilter,
        topic: &TopicDescriptor,
    ) -> Result<(), FilterError> {
        match (&mut *self, description) {
            (Filter::Expression(inst), ContentFilter::Expression(desc))
                if inst.expression == desc.expression =>
            {
                return inst.rebind(desc, topic);
            }
            (Filter::Function(inst), ContentFilter::Function(desc))
                if inst.function.same_function(&desc.function) =>
            {
                inst.arg = desc.arg.clone();
                return Ok(());
            }
            _ => {}
        }
        debug!("filter description changed, recreating instance");
        let fresh = Filter::create(self.domain_id(), description, topic)?;
        *self = fresh;
        Ok(())
    }

    /// Whether this filter was created from an equal description: same
    /// expression bytes and element-wise equal parameters, or same callback
    /// mode and function.
    pub fn matches_description(&self, description: &ContentFilter) -> bool {
        match (self, description) {
            (Filter::Expression(inst), ContentFilter::Expression(desc)) => {
                inst.expression == desc.expression && inst.params == desc.params
            }
            (Filter::Function(inst), ContentFilter::Function(desc)) => {
                inst.function.same_function(&desc.function)
            }
            _ => false,
        }
    }

    /// The reduced topic descriptor of an expression filter: only the
    /// fields the optimized expression references remain keyed.
    pub fn reduced_descriptor(&self) -> Option<&TopicDescriptor> {
        match self {
            Filter::Expression(inst) => Some(&inst.reduced),
            Filter::Function(_) => None,
        }
    }

    pub fn domain_id(&self) -> DomainId {
        match self {
            Filter::Expression(inst) => inst.domain_id,
            Filter::Function(inst) => inst.domain_id,
        }
    }
}

/// Reader-side accept with the no-filter pass-through: an absent filter
/// accepts every sample.
pub fn reader_accept(filter: Option<&mut Filter>, data: &[u8], info: &SampleInfo) -> bool {
    match filter {
        None => true,
        Some(f) => f.reader_accept(data, info),
    }
}

/// Writer-side accept with the no-filter pass-through.
pub fn writer_accept(filter: Option<&mut Filter>, sample: &dyn SampleView) -> bool {
    match filter {
        None => true,
        Some(f) => f.writer_accept(sample),
    }
}

/// The expression filter variant.
#[derive(Clone, Debug)]
pub struct ExpressionInstance {
    domain_id: DomainId,
    expression: String,
    params: Vec<FilterParam>,
    parsed: Expr,
    optimized: Expr,
    reduced: TopicDescriptor,
    codec: KeyCodec,
}

impl ExpressionInstance {
    fn create(
        domain_id: DomainId,
        desc: &ExpressionFilter,
        topic: &TopicDescriptor,
    ) -> Result<Self, FilterError> {
        let mut parsed = Expr::parse(&desc.expression)?;
        bind_params(&mut parsed, &desc.params)?;
        let (optimized, reduced, codec) = build_runtime(&parsed, topic)?;
        debug!(
            expression = %desc.expression,
            fields = reduced.keyed_fields().len(),
            "expression filter created"
        );
        Ok(ExpressionInstance {
            domain_id,
            expression: desc.expression.clone(),
            params: desc.params.clone(),
            parsed,
            optimized,
            reduced,
            codec,
        })
    }

    /// Re-binds parameters and rebuilds the optimized expression, the
    /// reduced descriptor and the codec (the surviving variable set can
    /// change with the parameter values).
    fn rebind(&mut self, desc: &ExpressionFilter, topic: &TopicDescriptor) -> Result<(), FilterError> {
        bind_params(&mut self.parsed, &desc.params)?;
        let (optimized, reduced, codec) = build_runtime(&self.parsed, topic)?;
        self.optimized = optimized;
        self.reduced = reduced;
        self.codec = codec;
        self.params = desc.params.clone();
        debug!("expression filter parameters rebound");
        Ok(())
    }

    fn reader_accept(&mut self, data: &[u8]) -> bool {
        let fields = match self.codec.decode(data) {
            Ok(fields) => fields,
            Err(err) => {
                trace!(%err, "sample rejected: undecodable key fields");
                debug_assert!(false, "undecodable sample: {err}");
                return false;
            }
        };
        for (name, value) in fields {
            if bind_field(&mut self.optimized, name, &value).is_err() {
                debug_assert!(false, "field {name} failed to bind");
                return false;
            }
        }
        self.evaluate()
    }

    fn writer_accept(&mut self, sample: &dyn SampleView) -> bool {
        for key in self.reduced.keyed_fields() {
            let Some(value) = sample.key_field(&key.name) else {
                trace!(field = %key.name, "sample rejected: missing key field");
                debug_assert!(false, "sample missing key field {}", key.name);
                return false;
            };
            if bind_field(&mut self.optimized, &key.name, &value).is_err() {
                debug_assert!(false, "field {} failed to bind", key.name);
                return false;
            }
        }
        self.evaluate()
    }

    fn evaluate(&self) -> bool {
        match self.optimized.eval_bool() {
            Ok(accept) => {
                if !accept {
                    trace!("sample rejected by expression");
                }
                accept
            }
            Err(err) => {
                trace!(%err, "sample rejected: evaluation failed");
                debug_assert!(false, "filter evaluation failed: {err}");
                false
            }
        }
    }
}

/// The function filter variant.
#[derive(Clone)]
pub struct FunctionInstance {
    domain_id: DomainId,
    function: FilterFn,
    arg: Option<FilterArg>,
    codec: KeyCodec,
}

impl FunctionInstance {
    fn create(
        domain_id: DomainId,
        desc: &FunctionFilter,
        topic: &TopicDescriptor,
    ) -> Result<Self, FilterError> {
        // Modes that deserialize the sample need every key field
        // materializable; reject unsupported kinds now, never at accept
        // time.
        if !matches!(desc.function, FilterFn::SampleInfoArg(_)) {
            for key in topic.keyed_fields() {
                key.kind.bindable()?;
            }
        }
        debug!(function = ?desc.function, "function filter created");
        Ok(FunctionInstance {
            domain_id,
            function: desc.function,
            arg: desc.arg.clone(),
            codec: KeyCodec::new(topic, topic),
        })
    }

    fn reader_accept(&self, data: &[u8], info: &SampleInfo) -> bool {
        match self.function {
            // This mode never needs the sample deserialized.
            FilterFn::SampleInfoArg(f) => f(info, self.arg.as_ref()),
            FilterFn::Sample(_) | FilterFn::SampleArg(_) | FilterFn::SampleSampleInfoArg(_) => {
                let mut sample = DecodedSample::default();
                match self.codec.decode(data) {
                    Ok(fields) => {
                        for (name, value) in fields {
                            sample.insert(name, value);
                        }
                    }
                    Err(err) => {
                        trace!(%err, "sample rejected: undecodable key fields");
                        debug_assert!(false, "undecodable sample: {err}");
                        return false;
                    }
                }
                match self.function {
                    FilterFn::Sample(f) => f(&sample),
                    FilterFn::SampleArg(f) => f(&sample, self.arg.as_ref()),
                    FilterFn::SampleSampleInfoArg(f) => f(&sample, info, self.arg.as_ref()),
                    FilterFn::SampleInfoArg(_) => unreachable!(),
                }
            }
        }
    }

    fn writer_accept(&self, sample: &dyn SampleView) -> bool {
        match self.function {
            // No sample info exists on the writer side for this mode.
            FilterFn::SampleInfoArg(_) => true,
            FilterFn::Sample(f) => f(sample),
            FilterFn::SampleArg(f) => f(sample, self.arg.as_ref()),
            FilterFn::SampleSampleInfoArg(f) => f(sample, &SampleInfo::default(), self.arg.as_ref()),
        }
    }
}

impl std::fmt::Debug for FunctionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionInstance")
            .field("domain_id", &self.domain_id)
            .field("function", &self.function)
            .field("has_arg", &self.arg.is_some())
            .finish()
    }
}

fn bind_params(expr: &mut Expr, params: &[FilterParam]) -> Result<(), FilterError> {
    for (position, param) in params.iter().enumerate() {
        let index =
            u32::try_from(position + 1).map_err(|_| FilterError::BadParameter)?;
        match param {
            FilterParam::Integer(value) => expr.bind_integer(index, *value)?,
            FilterParam::Real(value) => expr.bind_real(index, *value)?,
            FilterParam::String(value) => expr.bind_string(index, value)?,
            FilterParam::Blob(value) => {
                if u128::try_from(value.len()).unwrap_or(u128::MAX) >= i64::MAX as u128 {
                    return Err(FilterError::Unsupported("blob parameter too large"));
                }
                expr.bind_blob(index, value)?;
            }
        }
    }
    Ok(())
}

/// Builds the runtime half of an expression filter: the optimized
/// expression, the reduced key-set over the topic, and the codec that
/// deserializes only those fields.
fn build_runtime(
    parsed: &Expr,
    topic: &TopicDescriptor,
) -> Result<(Expr, TopicDescriptor, KeyCodec), FilterError> {
    let optimized = parsed.build()?;
    let names: Vec<&str> = optimized.variables().collect();
    for &name in &names {
        let field = topic.field(name).ok_or(FilterError::BadParameter)?;
        field.kind.bindable()?;
    }
    for key in topic.keyed_fields() {
        if !key.kind.skippable() {
            return Err(FilterError::Unsupported("wide key field in topic"));
        }
    }
    let reduced = topic.project(&names)?;
    let codec = KeyCodec::new(topic, &reduced);
    Ok((optimized, reduced, codec))
}

fn bind_field(expr: &mut Expr, name: &str, value: &FieldValue) -> Result<(), FilterError> {
    match value {
        FieldValue::Integer(i) => expr.bind_integer(name, *i)?,
        FieldValue::Real(r) => expr.bind_real(name, *r)?,
        FieldValue::Text(t) => expr.bind_string(name, t)?,
    }
    Ok(())
}
