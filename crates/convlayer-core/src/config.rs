//! Configuration registers: shadow and active snapshots.
//!
//! The control plane writes the *shadow* copy at any time. A run only ever
//! sees the *active* copy, which is replaced wholesale when the controller
//! enters Loading. Both copies are immutable `Copy` snapshots; a write
//! produces a new shadow value instead of mutating fields in place.

use convlayer_chip::geometry::{output_dim, KERNEL_SIZE, MAX_ENGINES};
use convlayer_chip::regs::{bcfg1, bcfg2, cprm1, BitField};
use tracing::debug;

use crate::error::{ConvError, Result};

/// One configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    /// Arithmetic right shift applied to each accumulator
    Shift,
    /// Number of engines in the run
    EngineCount,
    /// Side length of the square input
    MatrixSize,
    /// Window step along both axes
    Stride,
    /// Export tag for every result vector
    SaveToMem,
}

impl ConfigField {
    /// Every field, in register order.
    pub const ALL: [Self; 5] = [
        Self::EngineCount,
        Self::Shift,
        Self::MatrixSize,
        Self::Stride,
        Self::SaveToMem,
    ];

    /// Register holding the field.
    pub const fn register(self) -> Register {
        match self {
            Self::Shift | Self::EngineCount => Register::Bcfg1,
            Self::MatrixSize => Register::Bcfg2,
            Self::Stride | Self::SaveToMem => Register::Cprm1,
        }
    }

    /// Bit position within its register.
    pub const fn bits(self) -> BitField {
        match self {
            Self::Shift => bcfg1::SHIFT,
            Self::EngineCount => bcfg1::ENGINE_COUNT,
            Self::MatrixSize => bcfg2::MATRIX_SIZE,
            Self::Stride => cprm1::STRIDE,
            Self::SaveToMem => cprm1::SAVE_TO_MEM,
        }
    }

    /// Field name as it appears in the register map.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Shift => "SHIFT",
            Self::EngineCount => "ENGINE_COUNT",
            Self::MatrixSize => "MATRIX_SIZE",
            Self::Stride => "STRIDE",
            Self::SaveToMem => "SAVE_TO_MEM",
        }
    }
}

/// Configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Engine count and shift
    Bcfg1,
    /// Matrix size
    Bcfg2,
    /// Stride and export flag
    Cprm1,
}

impl Register {
    /// Byte offset in the register map.
    pub const fn offset(self) -> usize {
        match self {
            Self::Bcfg1 => convlayer_chip::regs::BCFG1,
            Self::Bcfg2 => convlayer_chip::regs::BCFG2,
            Self::Cprm1 => convlayer_chip::regs::CPRM1,
        }
    }

    /// Fields packed into this register.
    pub fn fields(self) -> impl Iterator<Item = ConfigField> {
        ConfigField::ALL
            .into_iter()
            .filter(move |field| field.register() == self)
    }
}

/// A complete configuration snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Configuration {
    /// Arithmetic right shift applied to each accumulator
    pub shift: u32,
    /// Number of engines in the run
    pub engine_count: u32,
    /// Side length of the square input
    pub matrix_size: u32,
    /// Window step along both axes
    pub stride: u32,
    /// Tag every result vector for export
    pub save_to_mem: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            shift: 0,
            engine_count: 1,
            matrix_size: KERNEL_SIZE as u32,
            stride: 1,
            save_to_mem: false,
        }
    }
}

impl Configuration {
    /// Set the shift.
    #[must_use]
    pub fn with_shift(mut self, shift: u32) -> Self {
        self.shift = shift;
        self
    }

    /// Set the engine count.
    #[must_use]
    pub fn with_engine_count(mut self, engine_count: u32) -> Self {
        self.engine_count = engine_count;
        self
    }

    /// Set the matrix size.
    #[must_use]
    pub fn with_matrix_size(mut self, matrix_size: u32) -> Self {
        self.matrix_size = matrix_size;
        self
    }

    /// Set the stride.
    #[must_use]
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Set the export flag.
    #[must_use]
    pub fn with_save_to_mem(mut self, save_to_mem: bool) -> Self {
        self.save_to_mem = save_to_mem;
        self
    }

    /// Raw value of one field.
    pub fn get(&self, field: ConfigField) -> u32 {
        match field {
            ConfigField::Shift => self.shift,
            ConfigField::EngineCount => self.engine_count,
            ConfigField::MatrixSize => self.matrix_size,
            ConfigField::Stride => self.stride,
            ConfigField::SaveToMem => u32::from(self.save_to_mem),
        }
    }

    /// Copy of `self` with one field replaced.
    ///
    /// # Errors
    ///
    /// Returns `FieldOutOfRange` if `value` is wider than the field.
    pub fn with_field(self, field: ConfigField, value: u32) -> Result<Self> {
        let bits = field.bits();
        if !bits.fits(value) {
            return Err(ConvError::FieldOutOfRange {
                field: field.name(),
                value,
                max: bits.max_value(),
            });
        }
        let mut next = self;
        match field {
            ConfigField::Shift => next.shift = value,
            ConfigField::EngineCount => next.engine_count = value,
            ConfigField::MatrixSize => next.matrix_size = value,
            ConfigField::Stride => next.stride = value,
            ConfigField::SaveToMem => next.save_to_mem = value != 0,
        }
        Ok(next)
    }

    /// Encode the fields that live in `register`.
    pub fn encode(&self, register: Register) -> u32 {
        register
            .fields()
            .fold(0, |word, field| field.bits().insert(word, self.get(field)))
    }

    /// Copy of `self` with every field of `register` decoded from `word`.
    ///
    /// Undefined bits are ignored.
    #[must_use]
    pub fn decode(self, register: Register, word: u32) -> Self {
        let mut next = self;
        for field in register.fields() {
            let value = field.bits().extract(word);
            match field {
                ConfigField::Shift => next.shift = value,
                ConfigField::EngineCount => next.engine_count = value,
                ConfigField::MatrixSize => next.matrix_size = value,
                ConfigField::Stride => next.stride = value,
                ConfigField::SaveToMem => next.save_to_mem = value != 0,
            }
        }
        next
    }

    /// Check that a run with this configuration can produce output.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the engine count is 0 or above the bank
    /// size, the matrix is smaller than the kernel, or the stride admits no
    /// window.
    pub fn validate(&self) -> Result<()> {
        if self.engine_count == 0 {
            return Err(ConvError::configuration("engine count is 0"));
        }
        if self.engine_count as usize > MAX_ENGINES {
            return Err(ConvError::configuration(format!(
                "engine count {} exceeds {MAX_ENGINES} slots",
                self.engine_count
            )));
        }
        if (self.matrix_size as usize) < KERNEL_SIZE {
            return Err(ConvError::configuration(format!(
                "matrix size {} smaller than {KERNEL_SIZE}x{KERNEL_SIZE} kernel",
                self.matrix_size
            )));
        }
        if output_dim(self.matrix_size as usize, self.stride as usize) == 0 {
            return Err(ConvError::configuration(format!(
                "stride {} admits no window",
                self.stride
            )));
        }
        Ok(())
    }

    /// Output rows (and columns) of a run.
    pub fn output_dim(&self) -> usize {
        output_dim(self.matrix_size as usize, self.stride as usize)
    }

    /// Result vectors a run produces.
    pub fn expected_outputs(&self) -> usize {
        let dim = self.output_dim();
        dim * dim
    }
}

/// Shadow + active configuration register file.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegisterFile {
    shadow: Configuration,
    active: Configuration,
    in_run: bool,
}

impl ConfigRegisterFile {
    /// Register file with the given shadow configuration.
    pub fn new(shadow: Configuration) -> Self {
        Self {
            shadow,
            active: shadow,
            in_run: false,
        }
    }

    /// Update one shadow field. The active copy is never touched.
    ///
    /// # Errors
    ///
    /// Returns `FieldOutOfRange` if `value` is wider than the field; the
    /// shadow copy is left unchanged.
    pub fn write(&mut self, field: ConfigField, value: u32) -> Result<()> {
        self.shadow = self.shadow.with_field(field, value)?;
        Ok(())
    }

    /// Active value during a run, shadow value otherwise.
    pub fn read(&self, field: ConfigField) -> u32 {
        self.visible().get(field)
    }

    /// Write a whole register word into the shadow copy.
    pub fn write_register(&mut self, register: Register, word: u32) {
        self.shadow = self.shadow.decode(register, word);
    }

    /// Read a whole register word, same visibility rule as [`Self::read`].
    pub fn read_register(&self, register: Register) -> u32 {
        self.visible().encode(register)
    }

    /// Replace the shadow snapshot wholesale.
    pub fn set_shadow(&mut self, shadow: Configuration) {
        self.shadow = shadow;
    }

    /// Validate the shadow copy and make it the active configuration.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the shadow copy is not runnable; the
    /// active copy is left unchanged and no run is started.
    pub fn clone_to_active(&mut self) -> Result<Configuration> {
        self.shadow.validate()?;
        self.active = self.shadow;
        self.in_run = true;
        debug!("config cloned: {:?}", self.active);
        Ok(self.active)
    }

    /// Mark the run over; reads go back to the shadow copy.
    pub fn end_run(&mut self) {
        self.in_run = false;
    }

    /// True between a successful clone and the end of that run.
    pub fn in_run(&self) -> bool {
        self.in_run
    }

    /// Pending configuration.
    pub fn shadow(&self) -> &Configuration {
        &self.shadow
    }

    /// Configuration of the current or most recent run.
    pub fn active(&self) -> &Configuration {
        &self.active
    }

    fn visible(&self) -> &Configuration {
        if self.in_run {
            &self.active
        } else {
            &self.shadow
        }
    }
}
