//! Object-table construction and the type-checking pass
//!
//! One forward walk over the finished ITA. `FUNC_START`/`FUNC_END` open
//! and seal stack frames, `MOV` instructions are deconstructed and
//! checked against B's pointer/vector/scalar discipline, and every
//! literal that needs a rip-relative data label is collected on the way.
//! A `GOTO` directly behind another `GOTO` is unreachable and removed,
//! the only clean-up this stage performs.

use crate::ast::HoistedSymbols;
use crate::error::{CompileError, ErrorKind, Result};
use crate::object::{Frame, ObjectTable, VectorEntry, label_as_human_readable};
use blang_core::quad::{Opcode, Quadruple};
use blang_core::types::{
    Datum, TypeTag, WORD_SIZE, is_binary_expression, is_vector_lvalue, unary_operand_of,
    unary_operator_of, vector_base, vector_index,
};
use blang_core::{SymbolTable, SymbolValue};

pub struct Table {
    pub instructions: Vec<Quadruple>,
    pub objects: ObjectTable,
    frame: Option<Frame>,
    index: usize,
}

/// Reassemble a `MOV`'s right-hand side; the 4-ary in-place form splits
/// its operator and operand across `op2`/`op3` (`MOV x -- x` -> `--x`).
fn rvalue_from_mov(quadruple: &Quadruple) -> String {
    if quadruple.op3.is_empty() {
        quadruple.op2.trim().to_string()
    } else {
        format!("{}{}", quadruple.op2, quadruple.op3)
    }
}

impl Table {
    pub fn new(
        instructions: Vec<Quadruple>,
        hoisted: HoistedSymbols,
        globals: SymbolTable,
    ) -> Self {
        Table {
            instructions,
            objects: ObjectTable::new(hoisted, globals),
            frame: None,
            index: 0,
        }
    }

    fn error(&self, kind: ErrorKind, detail: impl Into<String>) -> CompileError {
        let err = CompileError::new(kind, detail);
        match &self.frame {
            Some(frame) => err.at(format!("in function {}", frame.symbol)),
            None => err,
        }
    }

    fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frame.as_mut().ok_or_else(|| {
            CompileError::new(
                ErrorKind::InvalidStatement,
                "instruction outside of a function frame",
            )
        })
    }

    fn frame_ref(&self) -> Result<&Frame> {
        self.frame.as_ref().ok_or_else(|| {
            CompileError::new(
                ErrorKind::InvalidStatement,
                "instruction outside of a function frame",
            )
        })
    }

    /// Walk the instruction list once, front to back.
    pub fn build_from_ir_instructions(&mut self) -> Result<()> {
        self.build_vector_definitions_from_symbols()?;
        self.build_vector_definitions_from_globals();

        let mut last_opcode = Opcode::Noop;
        self.index = 0;
        while self.index < self.instructions.len() {
            let instruction = self.instructions[self.index].clone();
            match instruction.op {
                Opcode::FuncStart => self.from_func_start_instruction()?,
                Opcode::FuncEnd => self.from_func_end_instruction()?,
                Opcode::Locl => self.from_locl_instruction(&instruction)?,
                Opcode::Globl => self.from_globl_instruction(&instruction)?,
                Opcode::Label => self.from_label_instruction(&instruction)?,
                Opcode::Call => self.from_call_instruction(&instruction)?,
                Opcode::Push => self.from_push_instruction(&instruction)?,
                Opcode::Pop => self.from_pop_instruction(&instruction)?,
                Opcode::Ret => self.from_return_instruction(&instruction)?,
                Opcode::Mov => self.from_mov_instruction(&instruction)?,
                Opcode::Goto if last_opcode == Opcode::Goto => {
                    // unreachable second jump
                    self.instructions.remove(self.index);
                    last_opcode = Opcode::Goto;
                    continue;
                }
                _ => {}
            }
            last_opcode = instruction.op;
            self.index += 1;
        }
        Ok(())
    }

    /// Reserve vector storage for every hoisted `vector_lvalue`.
    fn build_vector_definitions_from_symbols(&mut self) -> Result<()> {
        for name in self.objects.hoisted.names() {
            if self.objects.hoisted.kind_of(&name) != Some("vector_lvalue") {
                continue;
            }
            let size = self.objects.hoisted.size_of(&name).unwrap_or(0) as usize;
            if size > VectorEntry::MAX_SIZE {
                let err = CompileError::new(
                    ErrorKind::StackOverflow,
                    format!("stack overflow, vector \"{}\" declares {} cells", name, size),
                );
                return Err(match self.objects.hoisted.location_of(&name) {
                    Some(location) => err.at(location),
                    None => err,
                });
            }
            self.objects
                .vectors
                .entry(name.clone())
                .or_insert_with(|| VectorEntry::new(name.clone(), size));
        }
        Ok(())
    }

    /// Copy vector definitions out of the global symbol table, recording
    /// each element literal for the data section.
    fn build_vector_definitions_from_globals(&mut self) {
        let globals: Vec<(String, Vec<Datum>)> = self
            .objects
            .globals
            .iter()
            .filter_map(|(name, value)| {
                value
                    .as_vector()
                    .map(|items| (name.clone(), items.to_vec()))
            })
            .collect();
        for (name, items) in globals {
            let mut entry = VectorEntry::new(name.clone(), items.len());
            for (index, item) in items.iter().enumerate() {
                self.objects.insert_address_storage(item);
                entry.data.insert(index.to_string(), item.clone());
            }
            self.objects.vectors.insert(name, entry);
        }
    }

    fn from_func_start_instruction(&mut self) -> Result<()> {
        if self.index == 0 {
            return Err(CompileError::invalid_ast("BeginFunc without a label"));
        }
        let label = self.instructions[self.index - 1].op1.clone();
        let human = label_as_human_readable(&label);
        if self.objects.labels.contains(&human) {
            return Err(self.error(
                ErrorKind::DuplicateDefinition,
                format!("function name already exists: \"{}\"", human),
            ));
        }
        let mut frame = Frame::new(&human);
        frame.set_parameters_from_symbolic_label(&label);
        for parameter in frame.parameters.clone() {
            if let Some(pointer) = parameter.strip_prefix('*') {
                frame.pointers.insert(pointer.to_string());
            }
        }
        frame.range[0] = self.index;
        self.objects.address_table.insert(label, self.index - 1);
        self.objects.labels.insert(human);
        self.frame = Some(frame);
        Ok(())
    }

    fn from_func_end_instruction(&mut self) -> Result<()> {
        let index = self.index;
        let mut frame = self.frame.take().ok_or_else(|| {
            CompileError::new(ErrorKind::InvalidStatement, "EndFunc without BeginFunc")
        })?;
        frame.range[1] = index + 1;
        self.objects.functions.insert(frame.symbol.clone(), frame);
        Ok(())
    }

    fn from_locl_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let frame = self.frame_mut()?;
        match instruction.op1.strip_prefix('*') {
            Some(pointer) => {
                frame.pointers.insert(pointer.to_string());
                frame.locals.define_scalar(pointer, Datum::null());
            }
            None => frame
                .locals
                .define_scalar(&instruction.op1, Datum::null()),
        }
        Ok(())
    }

    fn from_globl_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let name = instruction.op1.clone();
        if !self.objects.vectors.contains_key(&name) && !self.objects.globals.is_defined(&name) {
            return Err(self.error(
                ErrorKind::UndefinedSymbol,
                format!("extrn statement failed, identifier \"{}\" does not exist", name),
            ));
        }
        self.frame_mut()?.locals.define_scalar(name, Datum::null());
        Ok(())
    }

    fn from_label_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let index = self.index;
        let label = instruction.op1.clone();
        let duplicate = self
            .frame
            .as_ref()
            .is_some_and(|frame| frame.labels.contains(&label));
        if duplicate {
            return Err(self.error(
                ErrorKind::DuplicateDefinition,
                format!("label \"{}\" is already defined", label),
            ));
        }
        if let Some(frame) = self.frame.as_mut() {
            frame.labels.insert(label.clone());
            frame.label_addresses.insert(label, index);
        }
        Ok(())
    }

    fn from_call_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let name = &instruction.op1;
        if !self.objects.labels.contains(name) && !self.objects.hoisted.contains(name) {
            return Err(self.error(
                ErrorKind::UndefinedSymbol,
                format!("function call failed, function \"{}\" does not exist", name),
            ));
        }
        Ok(())
    }

    fn from_push_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let operand = instruction.op1.clone();
        let frame = self.frame_ref()?;
        if !frame.temporaries.contains(&operand) {
            return Err(self.error(
                ErrorKind::InvalidStatement,
                format!("push of unknown operand \"{}\"", operand),
            ));
        }
        let value = frame
            .resolve_temporary(&operand)
            .unwrap_or_else(|| operand.clone());
        self.objects.stack.push(value);
        Ok(())
    }

    /// Pop reclaims caller-pushed arguments in word units. The ternary
    /// lowering also emits a balancing `POP 8` with nothing mirrored on
    /// the logical stack; popping is therefore clamped, not an error.
    fn from_pop_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let bytes: usize = instruction.op1.parse().map_err(|_| {
            self.error(
                ErrorKind::InvalidAst,
                format!("malformed POP operand \"{}\"", instruction.op1),
            )
        })?;
        let count = (bytes / WORD_SIZE).min(self.objects.stack.len());
        let keep = self.objects.stack.len() - count;
        self.objects.stack.truncate(keep);
        Ok(())
    }

    fn from_return_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let value = instruction.op1.trim().to_string();
        let frame = self.frame_ref()?;
        if frame.ret.is_some() {
            return Err(self.error(
                ErrorKind::InvalidStatement,
                "invalid return statement, frame already returns",
            ));
        }
        let resolved = frame
            .resolve_temporary(&value)
            .unwrap_or_else(|| value.clone());
        self.frame_mut()?.ret = Some((value, resolved));
        Ok(())
    }

    fn is_vector_or_pointer(&self, text: &str) -> bool {
        if is_vector_lvalue(text) || text.starts_with('*') || text.starts_with('&') {
            return true;
        }
        match &self.frame {
            Some(frame) => frame.is_pointer(text),
            None => false,
        }
    }

    /// The MOV dispatch at the heart of the pass.
    fn from_mov_instruction(&mut self, instruction: &Quadruple) -> Result<()> {
        let lhs = instruction.op1.clone();
        let rhs = rvalue_from_mov(instruction);

        if lhs.starts_with("_t") || lhs.starts_with("_p") {
            return self.from_temporary_assignment(&lhs, &rhs);
        }
        if self.frame.is_some() && (rhs.starts_with("_t") || rhs.starts_with("_p")) {
            return self.from_temporary_reassignment(&lhs, &rhs);
        }
        if self.is_vector_or_pointer(&lhs) || self.is_vector_or_pointer(&rhs) {
            return self.from_pointer_or_vector_assignment(&lhs, &rhs);
        }
        {
            let frame = self.frame_ref()?;
            if self.objects.hoisted.contains(&rhs)
                || frame.locals.is_defined(&rhs)
                || frame.is_parameter(&rhs)
            {
                return self.from_scalar_symbol_assignment(&lhs, &rhs);
            }
        }

        let datum = if let Some(op) = unary_operator_of(&rhs) {
            self.from_rvalue_unary_expression(&lhs, &rhs, op)?
        } else if is_binary_expression(&rhs) {
            Datum::new(rhs.clone(), TypeTag::Word, WORD_SIZE)
        } else if let Some(datum) = Datum::parse(&rhs) {
            self.check_scalar_narrowing(&lhs, &datum)?;
            datum
        } else if rhs == "RET" || rhs.starts_with("CMP ") {
            Datum::new(rhs.clone(), TypeTag::Word, WORD_SIZE)
        } else {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!("invalid lvalue assignment on \"{}\" from \"{}\"", lhs, rhs),
            ));
        };

        let size = datum.size as u64;
        self.objects.insert_address_storage(&datum);
        let frame = self.frame_mut()?;
        frame.locals.define_scalar(&lhs, datum);
        frame.allocation += size;
        Ok(())
    }

    /// A widening immediate must not land in a narrow scalar.
    fn check_scalar_narrowing(&self, lhs: &str, datum: &Datum) -> Result<()> {
        let Some(frame) = &self.frame else {
            return Ok(());
        };
        if let Some(existing) = frame.locals.lookup_scalar(lhs)
            && matches!(existing.tag, TypeTag::Byte | TypeTag::Char)
            && datum.tag.is_integral()
            && datum.size > existing.size
        {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!(
                    "right-hand-side \"{}\" does not fit in {} \"{}\"",
                    datum.value, existing.tag, lhs
                ),
            ));
        }
        Ok(())
    }

    fn from_temporary_assignment(&mut self, lhs: &str, rhs: &str) -> Result<()> {
        let parsed = Datum::parse(rhs);
        let frame = self.frame_mut()?;
        frame.temporaries.insert(lhs, rhs.to_string());
        if lhs.starts_with("_p") {
            frame
                .locals
                .define_scalar(lhs, Datum::new(rhs, TypeTag::Word, WORD_SIZE));
        }
        if let Some(datum) = parsed {
            self.objects.insert_address_storage(&datum);
        }
        Ok(())
    }

    fn from_temporary_reassignment(&mut self, lhs: &str, rhs: &str) -> Result<()> {
        let (resolved, lhs_is_pointer) = {
            let frame = self.frame_ref()?;
            (
                frame.resolve_temporary(rhs).unwrap_or_default(),
                frame.is_pointer(lhs),
            )
        };
        if lhs_is_pointer && resolved == "RET" {
            self.frame_mut()?
                .locals
                .define_scalar(lhs, Datum::new("RET", TypeTag::Word, WORD_SIZE));
            return Ok(());
        }
        if self.is_vector_or_pointer(&resolved) {
            return self.from_pointer_or_vector_assignment(lhs, &resolved);
        }
        let value = if resolved.is_empty() { rhs } else { &resolved };
        self.frame_mut()?
            .locals
            .define_scalar(lhs, Datum::new(value, TypeTag::Word, WORD_SIZE));
        Ok(())
    }

    fn from_scalar_symbol_assignment(&mut self, lhs: &str, rhs: &str) -> Result<()> {
        let (lhs_datum, rhs_datum) = {
            let frame = self.frame_ref()?;
            let lhs_datum = frame.locals.lookup_scalar(lhs).cloned();
            let rhs_datum = if frame.is_parameter(rhs) {
                Some(Datum::word())
            } else {
                frame
                    .locals
                    .lookup_scalar(rhs)
                    .cloned()
                    .or_else(|| self.objects.globals.lookup_scalar(rhs).cloned())
            };
            (lhs_datum, rhs_datum)
        };
        let Some(lhs_datum) = lhs_datum else {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!(
                    "invalid lvalue assignment \"{}\", left-hand-side is not initialized",
                    lhs
                ),
            ));
        };
        let Some(rhs_datum) = rhs_datum else {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!(
                    "invalid lvalue assignment \"{}\", right-hand-side is not initialized",
                    rhs
                ),
            ));
        };
        if lhs_datum.size != 0 && rhs_datum.size != 0 && lhs_datum.size != rhs_datum.size {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!(
                    "cannot assign \"{}\" ({} bytes) to \"{}\" ({} bytes)",
                    rhs, rhs_datum.size, lhs, lhs_datum.size
                ),
            ));
        }
        self.frame_mut()?.locals.define_scalar(lhs, rhs_datum);
        Ok(())
    }

    /// Constant indices must address storage inside the declared size.
    fn check_vector_bounds(&self, lvalue: &str) -> Result<()> {
        let base = vector_base(unary_operand_of(lvalue));
        let Some(index) = vector_index(lvalue) else {
            return Ok(());
        };
        let Ok(index) = index.parse::<usize>() else {
            return Ok(()); // runtime index, checked at execution
        };
        let size = match self.objects.vectors.get(base) {
            Some(vector) => Some(vector.size),
            None => self
                .frame
                .as_ref()
                .and_then(|frame| frame.locals.lookup_scalar(base))
                .filter(|datum| datum.tag == TypeTag::Byte)
                .map(|datum| datum.size),
        };
        if let Some(size) = size
            && index >= size
        {
            return Err(self.error(
                ErrorKind::OutOfRangeIndex,
                format!("\"{}\" is outside the {} elements of \"{}\"", index, size, base),
            ));
        }
        Ok(())
    }

    fn element_datum(&self, base: &str, index: &str) -> Datum {
        self.objects
            .vectors
            .get(base)
            .and_then(|vector| vector.data.get(index))
            .cloned()
            .unwrap_or_else(Datum::word)
    }

    /// Pointer and vector assignments, the rule table:
    ///
    /// ```text
    /// auto *k, m, *z;
    /// k = &m;              allowed
    /// k = z;               allowed
    /// array[2] = m;        allowed
    /// array[1] = array[2]; allowed
    /// m = array[2];        allowed
    /// k = &array[2];       allowed
    /// ```
    ///
    /// Everything else between pointers and vectors is rejected.
    fn from_pointer_or_vector_assignment(&mut self, lhs: &str, rhs: &str) -> Result<()> {
        // right-hand side reads a vector element
        if is_vector_lvalue(rhs) {
            self.check_vector_bounds(rhs)?;
            let base = vector_base(unary_operand_of(rhs)).to_string();
            let index = vector_index(rhs).unwrap_or_default().to_string();
            let element_exists = {
                let frame = self.frame_ref()?;
                let constant = index.parse::<usize>().ok();
                frame.is_scalar_parameter(&index)
                    || frame.locals.is_defined(&index)
                    || self
                        .objects
                        .vectors
                        .get(&base)
                        .map(|vector| {
                            vector.data.contains(&index)
                                || constant.is_some_and(|i| i < vector.size)
                        })
                        .unwrap_or(false)
            };
            if !element_exists {
                return Err(self.error(
                    ErrorKind::OutOfRangeIndex,
                    format!(
                        "invalid vector assignment, element at \"{}\" does not exist",
                        index
                    ),
                ));
            }
            let element = self.element_datum(&base, &index);
            if is_vector_lvalue(lhs) {
                // array[i] = array[j]: element types must agree
                self.check_vector_bounds(lhs)?;
                let lhs_base = vector_base(lhs).to_string();
                let lhs_index = vector_index(lhs).unwrap_or_default().to_string();
                let existing = self.element_datum(&lhs_base, &lhs_index);
                if existing.tag != TypeTag::Null
                    && existing.tag != TypeTag::Word
                    && element.tag != TypeTag::Word
                    && existing.tag != element.tag
                {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        format!(
                            "invalid vector assignment, \"{}\" is {} but \"{}\" is {}",
                            rhs, element.tag, lhs, existing.tag
                        ),
                    ));
                }
                if let Some(vector) = self.objects.vectors.get_mut(&lhs_base) {
                    vector.data.insert(lhs_index, element);
                }
                return Ok(());
            }
            // scalar = array[i]: the scalar takes the element type
            let size = element.size as u64;
            let frame = self.frame_mut()?;
            frame.locals.define_scalar(lhs, element);
            frame.allocation += size;
            return Ok(());
        }

        // left-hand side writes a vector element
        if is_vector_lvalue(lhs) {
            self.check_vector_bounds(lhs)?;
            let base = vector_base(lhs).to_string();
            let index = vector_index(lhs).unwrap_or_default().to_string();
            let incoming = Datum::parse(rhs).or_else(|| {
                self.frame
                    .as_ref()
                    .and_then(|frame| frame.locals.lookup_scalar(rhs))
                    .cloned()
            });
            if let Some(incoming) = incoming {
                let existing = self.element_datum(&base, &index);
                if existing.tag != TypeTag::Null
                    && existing.tag != TypeTag::Word
                    && incoming.tag != TypeTag::Null
                    && incoming.tag != TypeTag::Word
                    && existing.tag != incoming.tag
                {
                    return Err(self.error(
                        ErrorKind::TypeMismatch,
                        format!(
                            "invalid vector assignment, \"{}\" is {} but \"{}\" holds {}",
                            rhs, incoming.tag, lhs, existing.tag
                        ),
                    ));
                }
                self.objects.insert_address_storage(&incoming);
                if let Some(vector) = self.objects.vectors.get_mut(&base) {
                    vector.data.insert(index, incoming);
                }
            }
            return Ok(());
        }

        // store through a pointer: *p = value, value must fit the pointee
        if lhs.starts_with('*') {
            let base = lhs.strip_prefix('*').unwrap_or(lhs).to_string();
            let (is_pointer, pointee_size) = {
                let frame = self.frame_ref()?;
                let pointee = frame
                    .locals
                    .pointer_target(&base)
                    .and_then(|target| frame.locals.lookup_scalar(target))
                    .map(|datum| datum.size)
                    .filter(|size| *size != 0)
                    .unwrap_or(WORD_SIZE);
                (frame.is_pointer(&base), pointee)
            };
            if !is_pointer {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    format!("\"{}\" is not a pointer, cannot store through it", base),
                ));
            }
            let value_size = Datum::parse(rhs)
                .map(|datum| datum.size)
                .or_else(|| {
                    self.frame
                        .as_ref()
                        .and_then(|frame| frame.locals.lookup_scalar(rhs))
                        .map(|datum| datum.size)
                })
                .unwrap_or(WORD_SIZE);
            if value_size > pointee_size {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    format!(
                        "\"{}\" ({} bytes) does not fit through \"{}\" ({} bytes)",
                        rhs, value_size, lhs, pointee_size
                    ),
                ));
            }
            return Ok(());
        }

        // address-of: the target must exist and the destination must be a
        // pointer
        if let Some(target) = rhs.strip_prefix('&') {
            let target = target.trim().to_string();
            let (lhs_is_pointer, target_defined) = {
                let frame = self.frame_ref()?;
                let base = vector_base(&target);
                (
                    frame.is_pointer(lhs),
                    frame.locals.is_defined(base)
                        || frame.is_parameter(base)
                        || self.objects.vectors.contains_key(base)
                        || self.objects.globals.is_defined(base),
                )
            };
            if !lhs_is_pointer {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    format!(
                        "invalid pointer assignment, left-hand-side \"{}\" is not a pointer",
                        lhs
                    ),
                ));
            }
            if !target_defined {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    format!(
                        "invalid pointer assignment, right-hand-side \"{}\" is not initialized",
                        target
                    ),
                ));
            }
            if is_vector_lvalue(&target) {
                self.check_vector_bounds(&target)?;
            }
            let frame = self.frame_mut()?;
            frame.pointers.insert(lhs.to_string());
            frame.locals.define(lhs, SymbolValue::Pointer(target));
            return Ok(());
        }

        // read through a pointer: `x = *k`; B has no casts, so a pointer
        // destination would be a pointer-to-pointer dereference
        if let Some(base) = rhs.strip_prefix('*') {
            let base = base.trim().to_string();
            let (lhs_is_pointer, base_is_pointer) = {
                let frame = self.frame_ref()?;
                (frame.is_pointer(lhs), frame.is_pointer(&base))
            };
            if lhs_is_pointer {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    format!(
                        "dereference on invalid lvalue, \"{}\" is itself a pointer",
                        lhs
                    ),
                ));
            }
            if !base_is_pointer {
                return Err(self.error(
                    ErrorKind::TypeMismatch,
                    format!("\"{}\" is not a pointer, cannot read through it", base),
                ));
            }
            self.frame_mut()?.locals.define_scalar(lhs, Datum::word());
            return Ok(());
        }

        let (lhs_is_pointer, rhs_is_pointer, rhs_target) = {
            let frame = self.frame_ref()?;
            (
                frame.is_pointer(lhs),
                frame.is_pointer(rhs),
                frame.locals.pointer_target(rhs).map(str::to_string),
            )
        };
        if rhs_is_pointer {
            // pointer = pointer copies the binding; a scalar destination
            // takes the pointer as a word
            let frame = self.frame_mut()?;
            if lhs_is_pointer {
                match rhs_target {
                    Some(target) => frame.locals.define(lhs, SymbolValue::Pointer(target)),
                    None => frame.locals.define_scalar(lhs, Datum::word()),
                }
            } else {
                frame.locals.define_scalar(lhs, Datum::word());
            }
            return Ok(());
        }
        if lhs_is_pointer {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!(
                    "invalid pointer assignment, \"{}\" only accepts an address",
                    lhs
                ),
            ));
        }
        Ok(())
    }

    /// Unary right-hand sides: re-dispatch on the operator. Address and
    /// dereference spellings are intercepted by the pointer/vector path
    /// before this runs, so only the numeric forms remain.
    fn from_rvalue_unary_expression(
        &mut self,
        lhs: &str,
        rhs: &str,
        operator: &str,
    ) -> Result<Datum> {
        match operator {
            "+" | "-" | "++" | "--" | "~" => self.from_integral_unary_expression(lhs, rhs),
            _ => Ok(self
                .frame_ref()?
                .locals
                .lookup_scalar(lhs)
                .cloned()
                .unwrap_or_else(Datum::null)),
        }
    }

    /// Numeric unaries require an initialized, integral operand and
    /// propagate its type.
    fn from_integral_unary_expression(&mut self, lhs: &str, rhs: &str) -> Result<Datum> {
        let operand = unary_operand_of(rhs).to_string();
        let frame = self.frame_ref()?;
        let datum = if let Some(datum) = frame.locals.lookup_scalar(&operand) {
            Some(datum.clone())
        } else if frame.is_parameter(&operand) {
            Some(Datum::word())
        } else if frame.temporaries.contains(&operand) {
            frame
                .resolve_temporary(&operand)
                .and_then(|resolved| Datum::parse(&resolved))
                .or(Some(Datum::word()))
        } else if let Some(datum) = Datum::parse(&operand) {
            Some(datum)
        } else {
            None
        };
        let Some(datum) = datum else {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!(
                    "invalid numeric unary expression, lvalue symbol \"{}\" is not initialized",
                    operand
                ),
            ));
        };
        if !matches!(datum.tag, TypeTag::Null) && !datum.tag.is_integral() {
            return Err(self.error(
                ErrorKind::TypeMismatch,
                format!(
                    "invalid numeric unary expression on \"{}\", \"{}\" is {}",
                    lhs, operand, datum.tag
                ),
            ));
        }
        Ok(datum)
    }
}

/// Run the pass over a finished instruction stream.
pub fn build_object_table(
    instructions: Vec<Quadruple>,
    hoisted: HoistedSymbols,
    globals: SymbolTable,
) -> Result<(Vec<Quadruple>, ObjectTable)> {
    let mut table = Table::new(instructions, hoisted, globals);
    table.build_from_ir_instructions()?;
    Ok((table.instructions, table.objects))
}
