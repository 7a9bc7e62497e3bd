use std::collections::HashMap;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::types::FloatType;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FloatValue, FunctionValue, IntValue, PointerValue};
use inkwell::{AddressSpace, FloatPredicate, OptimizationLevel};

use crate::ast::{BinOp, Block, Expr, ExprKind, File, Function};
use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// The compilation-unit value: the IR context, module, and builder bundled
/// together and threaded explicitly through emission, instead of living as
/// process-wide globals the way the historical implementation kept them.
/// A fresh `Emitter` is all a caller needs for one independent compilation.
pub struct Emitter<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    named_values: HashMap<String, PointerValue<'ctx>>,
    printf: Option<FunctionValue<'ctx>>,
}

impl<'ctx> Emitter<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        Self {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            named_values: HashMap::new(),
            printf: None,
        }
    }

    pub fn into_module(self) -> Module<'ctx> {
        self.module
    }

    /// Lowers every function in `file`, then verifies the module as a
    /// whole. Per-function verification catches a broken function early;
    /// the module-level pass catches anything that only shows up once
    /// every function is in place (e.g. a call to a function declared
    /// with a mismatched signature).
    pub fn compile_file(&mut self, file: &File) -> Result<(), Diagnostic> {
        for function in file {
            self.compile_function(function)?;
        }
        self.module.verify().map_err(|message| {
            Diagnostic::emitter_error(
                format!("internal verification failure: {message}"),
                Span::dummy(),
            )
        })
    }

    fn double(&self) -> FloatType<'ctx> {
        self.context.f64_type()
    }

    fn current_function(&self) -> FunctionValue<'ctx> {
        self.builder
            .get_insert_block()
            .expect("builder has an active insertion point while lowering a function body")
            .get_parent()
            .expect("every basic block belongs to a function")
    }

    fn failure(&self, span: Span, err: impl std::fmt::Display) -> Diagnostic {
        Diagnostic::emitter_error(format!("internal LLVM builder error: {err}"), span)
    }

    fn compile_function(&mut self, func: &Function) -> Result<FunctionValue<'ctx>, Diagnostic> {
        let proto = &func.proto.node;
        let span = func.proto.span;
        let double = self.double();

        if self.module.get_function(&proto.name).is_some() {
            return Err(Diagnostic::emitter_error(
                format!("Function cannot be redefined: {}", proto.name),
                span,
            ));
        }

        let param_types: Vec<_> = proto.params.iter().map(|_| double.into()).collect();
        let fn_type = double.fn_type(&param_types, false);
        let function = self
            .module
            .add_function(&proto.name, fn_type, Some(Linkage::External));

        for (param, name) in function.get_param_iter().zip(&proto.params) {
            param.into_float_value().set_name(name);
        }

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        self.named_values.clear();
        for (param, name) in function.get_param_iter().zip(&proto.params) {
            let slot = self
                .builder
                .build_alloca(double, name)
                .map_err(|e| self.failure(span, e))?;
            self.builder
                .build_store(slot, param)
                .map_err(|e| self.failure(span, e))?;
            self.named_values.insert(name.clone(), slot);
        }

        let body_value = self.compile_block(&func.body)?;
        self.builder
            .build_return(Some(&body_value))
            .map_err(|e| self.failure(span, e))?;

        if !function.verify(true) {
            unsafe {
                function.delete();
            }
            return Err(Diagnostic::emitter_error(
                format!("internal verification failure in function '{}'", proto.name),
                span,
            ));
        }

        Ok(function)
    }

    /// A block's value is the value of its last expression, or `0.0` for
    /// an empty block — the same rule applies uniformly to function
    /// bodies, `if`/`else` arms, and `for` bodies.
    fn compile_block(&mut self, block: &Block) -> Result<FloatValue<'ctx>, Diagnostic> {
        let mut last = None;
        for expr in &block.exprs {
            last = Some((self.compile_expr(expr)?, expr.span));
        }
        match last {
            Some((value, span)) => self.expect_double(value, span),
            None => Ok(self.double().const_float(0.0)),
        }
    }

    fn expect_double(&self, value: BasicValueEnum<'ctx>, span: Span) -> Result<FloatValue<'ctx>, Diagnostic> {
        match value {
            BasicValueEnum::FloatValue(f) => Ok(f),
            _ => Err(Diagnostic::emitter_error(
                "a string value may only be used as the immediate argument to print",
                span,
            )),
        }
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let span = expr.span;
        match &expr.node {
            ExprKind::Number(n) => Ok(self.double().const_float(*n).into()),

            ExprKind::String(s) => {
                let ptr = self
                    .builder
                    .build_global_string_ptr(s, "string")
                    .map_err(|e| self.failure(span, e))?;
                Ok(ptr.as_pointer_value().into())
            }

            ExprKind::Variable(name) => {
                let slot = *self.named_values.get(name).ok_or_else(|| {
                    Diagnostic::emitter_error(format!("Unknown variable name: {name}"), span)
                })?;
                let value = self
                    .builder
                    .build_load(self.double(), slot, name)
                    .map_err(|e| self.failure(span, e))?;
                Ok(value)
            }

            ExprKind::BinaryOp { op, lhs, rhs } => {
                let lhs_value = self.compile_expr(lhs)?;
                let rhs_value = self.compile_expr(rhs)?;
                let lhs_value = self.expect_double(lhs_value, lhs.span)?;
                let rhs_value = self.expect_double(rhs_value, rhs.span)?;
                Ok(self.compile_binary(*op, lhs_value, rhs_value, span)?.into())
            }

            ExprKind::Assign { name, value } => {
                let value = self.compile_expr(value)?;
                let value = self.expect_double(value, span)?;
                match self.named_values.get(name).copied() {
                    Some(slot) => {
                        self.builder
                            .build_store(slot, value)
                            .map_err(|e| self.failure(span, e))?;
                    }
                    None => {
                        let slot = self
                            .builder
                            .build_alloca(self.double(), name)
                            .map_err(|e| self.failure(span, e))?;
                        self.builder
                            .build_store(slot, value)
                            .map_err(|e| self.failure(span, e))?;
                        self.named_values.insert(name.clone(), slot);
                    }
                }
                Ok(value.into())
            }

            ExprKind::Call { callee, args } => self.compile_call(callee, args, span),

            ExprKind::Print(inner) => self.compile_print(inner, span),

            ExprKind::If { cond, then_block, else_block } => {
                Ok(self.compile_if(cond, then_block, else_block, span)?.into())
            }

            ExprKind::For { var, start, end, step, body } => Ok(self
                .compile_for(var, start, end, step.as_deref(), body, span)?
                .into()),
        }
    }

    fn compile_binary(
        &mut self,
        op: BinOp,
        lhs: FloatValue<'ctx>,
        rhs: FloatValue<'ctx>,
        span: Span,
    ) -> Result<FloatValue<'ctx>, Diagnostic> {
        let name = op.inst_name();
        let value = match op {
            BinOp::Add => self.builder.build_float_add(lhs, rhs, name),
            BinOp::Sub => self.builder.build_float_sub(lhs, rhs, name),
            BinOp::Mul => self.builder.build_float_mul(lhs, rhs, name),
            BinOp::Div => self.builder.build_float_div(lhs, rhs, name),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                let predicate = match op {
                    BinOp::Eq => FloatPredicate::OEQ,
                    BinOp::Ne => FloatPredicate::ONE,
                    BinOp::Lt => FloatPredicate::OLT,
                    BinOp::Gt => FloatPredicate::OGT,
                    BinOp::Le => FloatPredicate::OLE,
                    BinOp::Ge => FloatPredicate::OGE,
                    _ => unreachable!(),
                };
                let cmp = self
                    .builder
                    .build_float_compare(predicate, lhs, rhs, name)
                    .map_err(|e| self.failure(span, e))?;
                // Comparisons widen back to double immediately: every
                // expression in this language evaluates to a double except
                // `print`'s string argument, and `if`/`for` conditions know
                // how to narrow a double back down when they need i1.
                return self
                    .builder
                    .build_unsigned_int_to_float(cmp, self.double(), "booltmp")
                    .map_err(|e| self.failure(span, e));
            }
        };
        value.map_err(|e| self.failure(span, e))
    }

    fn compile_call(&mut self, callee: &str, args: &[Expr], span: Span) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let function = self
            .module
            .get_function(callee)
            .ok_or_else(|| Diagnostic::emitter_error(format!("Unknown function referenced: {callee}"), span))?;

        if function.count_params() as usize != args.len() {
            return Err(Diagnostic::emitter_error(
                format!("Incorrect number of arguments passed to function: {callee}"),
                span,
            ));
        }

        let mut arg_values: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.compile_expr(arg)?;
            let value = self.expect_double(value, arg.span)?;
            arg_values.push(value.into());
        }

        let call = self
            .builder
            .build_call(function, &arg_values, "calltmp")
            .map_err(|e| self.failure(span, e))?;

        call.try_as_basic_value()
            .left()
            .ok_or_else(|| Diagnostic::emitter_error(format!("call to '{callee}' produced no value"), span))
    }

    fn compile_print(&mut self, inner: &Expr, span: Span) -> Result<BasicValueEnum<'ctx>, Diagnostic> {
        let value = self.compile_expr(inner)?;
        let printf = self.get_or_declare_printf();

        let format = match value {
            BasicValueEnum::PointerValue(_) => self.builder.build_global_string_ptr("%s\n", "fmt_s"),
            BasicValueEnum::FloatValue(_) => self.builder.build_global_string_ptr("%f\n", "fmt_f"),
            _ => return Err(Diagnostic::emitter_error("unsupported value passed to print", span)),
        }
        .map_err(|e| self.failure(span, e))?;

        self.builder
            .build_call(printf, &[format.as_pointer_value().into(), value.into()], "printfCall")
            .map_err(|e| self.failure(span, e))?;

        Ok(self.double().const_float(0.0).into())
    }

    fn get_or_declare_printf(&mut self) -> FunctionValue<'ctx> {
        if let Some(function) = self.printf {
            return function;
        }
        let char_ptr = self.context.ptr_type(AddressSpace::default());
        let printf_type = self.context.i32_type().fn_type(&[char_ptr.into()], true);
        let function = self.module.add_function("printf", printf_type, Some(Linkage::External));
        self.printf = Some(function);
        function
    }

    /// Narrows a double or i1 condition value down to i1. A double narrows
    /// via `fcmp one cond, 0.0`, matching C's "nonzero is true"; an i1
    /// value (nothing in this language produces one directly today, but
    /// the rule is here in case a later builtin does) passes through.
    fn to_condition(&mut self, value: BasicValueEnum<'ctx>, span: Span) -> Result<IntValue<'ctx>, Diagnostic> {
        match value {
            BasicValueEnum::FloatValue(f) => self
                .builder
                .build_float_compare(FloatPredicate::ONE, f, self.double().const_float(0.0), "ifcond")
                .map_err(|e| self.failure(span, e)),
            BasicValueEnum::IntValue(i) if i.get_type().get_bit_width() == 1 => Ok(i),
            _ => Err(Diagnostic::emitter_error("unsupported condition type", span)),
        }
    }

    /// Three-block `then`/`else`/`merge` lowering with a φ-node joining the
    /// two arm values. The block each arm actually terminates in (not
    /// necessarily the block it started in, since the arm's own body may
    /// have branched) is what the φ node's incoming edges must name.
    fn compile_if(
        &mut self,
        cond: &Expr,
        then_block: &Block,
        else_block: &Block,
        span: Span,
    ) -> Result<FloatValue<'ctx>, Diagnostic> {
        let cond_value = self.compile_expr(cond)?;
        let cond_value = self.to_condition(cond_value, cond.span)?;

        let function = self.current_function();
        let then_bb = self.context.append_basic_block(function, "then");
        let else_bb = self.context.append_basic_block(function, "else");
        let merge_bb = self.context.append_basic_block(function, "ifcont");

        self.builder
            .build_conditional_branch(cond_value, then_bb, else_bb)
            .map_err(|e| self.failure(span, e))?;

        self.builder.position_at_end(then_bb);
        let then_value = self.compile_block(then_block)?;
        self.builder
            .build_unconditional_branch(merge_bb)
            .map_err(|e| self.failure(span, e))?;
        let then_end_bb = self.builder.get_insert_block().unwrap();

        self.builder.position_at_end(else_bb);
        let else_value = self.compile_block(else_block)?;
        self.builder
            .build_unconditional_branch(merge_bb)
            .map_err(|e| self.failure(span, e))?;
        let else_end_bb = self.builder.get_insert_block().unwrap();

        self.builder.position_at_end(merge_bb);
        let phi = self
            .builder
            .build_phi(self.double(), "iftmp")
            .map_err(|e| self.failure(span, e))?;
        phi.add_incoming(&[(&then_value, then_end_bb), (&else_value, else_end_bb)]);

        Ok(phi.as_basic_value().into_float_value())
    }

    /// Preheader/loop/after lowering. The loop variable lives in a φ node
    /// fed from the preheader (the start value) and from the loop body's
    /// terminating block (the stepped value), exactly like the classic
    /// induction-variable pattern; a matching stack slot is kept alongside
    /// it so the body can read the variable with an ordinary load. Any
    /// outer binding the loop variable's name shadows is restored once the
    /// loop exits.
    fn compile_for(
        &mut self,
        var: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Block,
        span: Span,
    ) -> Result<FloatValue<'ctx>, Diagnostic> {
        let start_value = self.compile_expr(start)?;
        let start_value = self.expect_double(start_value, start.span)?;

        let preheader_bb = self.builder.get_insert_block().unwrap();
        let function = self.current_function();
        let loop_bb = self.context.append_basic_block(function, "loop");

        self.builder
            .build_unconditional_branch(loop_bb)
            .map_err(|e| self.failure(span, e))?;
        self.builder.position_at_end(loop_bb);

        let phi = self
            .builder
            .build_phi(self.double(), var)
            .map_err(|e| self.failure(span, e))?;
        phi.add_incoming(&[(&start_value, preheader_bb)]);

        let slot = self
            .builder
            .build_alloca(self.double(), var)
            .map_err(|e| self.failure(span, e))?;
        self.builder
            .build_store(slot, phi.as_basic_value())
            .map_err(|e| self.failure(span, e))?;
        let previous = self.named_values.insert(var.to_string(), slot);

        self.compile_block(body)?;

        let step_value = match step {
            Some(step_expr) => {
                let value = self.compile_expr(step_expr)?;
                self.expect_double(value, step_expr.span)?
            }
            None => self.double().const_float(1.0),
        };
        let next_value = self
            .builder
            .build_float_add(phi.as_basic_value().into_float_value(), step_value, "nextvar")
            .map_err(|e| self.failure(span, e))?;

        let end_value = self.compile_expr(end)?;
        let end_cond = self.to_condition(end_value, end.span)?;

        let loop_end_bb = self.builder.get_insert_block().unwrap();
        phi.add_incoming(&[(&next_value, loop_end_bb)]);

        let after_bb = self.context.append_basic_block(function, "afterloop");
        self.builder
            .build_conditional_branch(end_cond, loop_bb, after_bb)
            .map_err(|e| self.failure(span, e))?;
        self.builder.position_at_end(after_bb);

        match previous {
            Some(prior_slot) => {
                self.named_values.insert(var.to_string(), prior_slot);
            }
            None => {
                self.named_values.remove(var);
            }
        }

        Ok(self.double().const_float(0.0))
    }
}

/// Runs the default `-O3` pipeline over the finished module in place.
/// Invoked as a single opaque pass-manager call; the compiler does not
/// pick individual passes.
pub fn optimize(module: &Module) -> Result<(), Diagnostic> {
    Target::initialize_native(&InitializationConfig::default())
        .map_err(|e| Diagnostic::emitter_error(format!("failed to initialize native target: {e}"), Span::dummy()))?;

    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple)
        .map_err(|e| Diagnostic::emitter_error(format!("failed to resolve target triple: {e}"), Span::dummy()))?;
    let machine = target
        .create_target_machine(
            &triple,
            "generic",
            "",
            OptimizationLevel::Default,
            RelocMode::Default,
            CodeModel::Default,
        )
        .ok_or_else(|| Diagnostic::emitter_error("failed to create a target machine for optimization", Span::dummy()))?;

    module
        .run_passes("default<O3>", &machine, PassBuilderOptions::create())
        .map_err(|e| Diagnostic::emitter_error(format!("optimization pipeline failed: {e}"), Span::dummy()))
}

/// Compiles a parsed file to LLVM textual IR. `module_name` is embedded
/// verbatim in the module header; callers that want byte-identical output
/// across runs should pass a fixed name rather than deriving one from a
/// timestamp or path.
pub fn compile_to_ir(file: &File, module_name: &str) -> Result<String, Diagnostic> {
    let context = Context::create();
    let mut emitter = Emitter::new(&context, module_name);
    emitter.compile_file(file)?;
    let module = emitter.into_module();
    optimize(&module)?;
    Ok(module.print_to_string().to_string())
}

/// Emits textual IR straight from the emitter, skipping the `O3` pipeline.
/// The driver never calls this — it exists so emitter unit tests can assert
/// on the basic-block shape (`then`/`else`/`ifcont`, `loop`/`afterloop`)
/// that `compile_to_ir`'s optimization pass is free to collapse away (e.g.
/// into a `select`).
#[cfg(test)]
fn compile_to_unoptimized_ir(file: &File, module_name: &str) -> Result<String, Diagnostic> {
    let context = Context::create();
    let mut emitter = Emitter::new(&context, module_name);
    emitter.compile_file(file)?;
    let module = emitter.into_module();
    Ok(module.print_to_string().to_string())
}
