//! Simplifies the implementation from "highs" crate, only supporting
//! a row-wise problem builder, while adding integer columns so the same
//! problem can be loaded either as an LP or as a MIP.

use std::convert::TryFrom;
use std::ffi::{c_void, CString};
use std::fmt::{Debug, Formatter};
use std::num::TryFromIntError;
use std::ops::{Bound, RangeBounds};
use std::os::raw::c_char;

use highs_sys::*;

/// The kinds of results of an optimization
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsModelStatus {
    /// not initialized
    NotSet = MODEL_STATUS_NOTSET as isize,
    /// Unable to load model
    LoadError = MODEL_STATUS_LOAD_ERROR as isize,
    /// invalid model
    ModelError = MODEL_STATUS_MODEL_ERROR as isize,
    /// Unable to run the pre-solve phase
    PresolveError = MODEL_STATUS_PRESOLVE_ERROR as isize,
    /// Unable to solve
    SolveError = MODEL_STATUS_SOLVE_ERROR as isize,
    /// Unable to clean after solve
    PostsolveError = MODEL_STATUS_POSTSOLVE_ERROR as isize,
    /// No variables in the model: nothing to optimize
    ModelEmpty = MODEL_STATUS_MODEL_EMPTY as isize,
    /// There is no solution to the problem
    Infeasible = MODEL_STATUS_INFEASIBLE as isize,
    /// The problem in unbounded or infeasible
    UnboundedOrInfeasible = MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE as isize,
    /// The problem is unbounded: there is no single optimal value
    Unbounded = MODEL_STATUS_UNBOUNDED as isize,
    /// An optimal solution was found
    Optimal = MODEL_STATUS_OPTIMAL as isize,
    /// objective bound
    ObjectiveBound = MODEL_STATUS_OBJECTIVE_BOUND as isize,
    /// objective target
    ObjectiveTarget = MODEL_STATUS_OBJECTIVE_TARGET as isize,
    /// reached limit
    ReachedTimeLimit = MODEL_STATUS_REACHED_TIME_LIMIT as isize,
    /// reached limit
    ReachedIterationLimit = MODEL_STATUS_REACHED_ITERATION_LIMIT as isize,
    /// Unknown model status
    Unknown = MODEL_STATUS_UNKNOWN as isize,
}

/// An unexpected status value was returned by HiGHS
#[derive(PartialEq, Clone, Copy)]
pub struct InvalidStatus(pub HighsInt);

impl Debug for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid HiGHS model status", self.0)
    }
}

impl TryFrom<HighsInt> for HighsModelStatus {
    type Error = InvalidStatus;

    fn try_from(value: HighsInt) -> Result<Self, Self::Error> {
        match value {
            MODEL_STATUS_NOTSET => Ok(Self::NotSet),
            MODEL_STATUS_LOAD_ERROR => Ok(Self::LoadError),
            MODEL_STATUS_MODEL_ERROR => Ok(Self::ModelError),
            MODEL_STATUS_PRESOLVE_ERROR => Ok(Self::PresolveError),
            MODEL_STATUS_SOLVE_ERROR => Ok(Self::SolveError),
            MODEL_STATUS_POSTSOLVE_ERROR => Ok(Self::PostsolveError),
            MODEL_STATUS_MODEL_EMPTY => Ok(Self::ModelEmpty),
            MODEL_STATUS_INFEASIBLE => Ok(Self::Infeasible),
            MODEL_STATUS_UNBOUNDED => Ok(Self::Unbounded),
            MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => {
                Ok(Self::UnboundedOrInfeasible)
            }
            MODEL_STATUS_OPTIMAL => Ok(Self::Optimal),
            MODEL_STATUS_OBJECTIVE_BOUND => Ok(Self::ObjectiveBound),
            MODEL_STATUS_OBJECTIVE_TARGET => Ok(Self::ObjectiveTarget),
            MODEL_STATUS_REACHED_TIME_LIMIT => Ok(Self::ReachedTimeLimit),
            MODEL_STATUS_REACHED_ITERATION_LIMIT => {
                Ok(Self::ReachedIterationLimit)
            }
            MODEL_STATUS_UNKNOWN => Ok(Self::Unknown),
            n => Err(InvalidStatus(n)),
        }
    }
}

/// The status of a highs operation
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsStatus {
    /// Success
    OK = 0,
    /// Done, with warning
    Warning = 1,
    /// An error occurred
    Error = 2,
}

impl From<TryFromIntError> for HighsStatus {
    fn from(_: TryFromIntError) -> Self {
        Self::Error
    }
}

impl From<InvalidStatus> for HighsStatus {
    fn from(_: InvalidStatus) -> Self {
        Self::Error
    }
}

impl TryFrom<HighsInt> for HighsStatus {
    type Error = InvalidStatus;

    fn try_from(value: HighsInt) -> Result<Self, InvalidStatus> {
        match value {
            STATUS_OK => Ok(Self::OK),
            STATUS_WARNING => Ok(Self::Warning),
            STATUS_ERROR => Ok(Self::Error),
            n => Err(InvalidStatus(n)),
        }
    }
}

pub trait HighsOptionValue {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> HighsInt;
}

impl HighsOptionValue for bool {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> HighsInt {
        Highs_setBoolOptionValue(highs, option, if self { 1 } else { 0 })
    }
}

impl HighsOptionValue for i32 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> HighsInt {
        Highs_setIntOptionValue(highs, option, self as HighsInt)
    }
}

impl HighsOptionValue for f64 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> HighsInt {
        Highs_setDoubleOptionValue(highs, option, self)
    }
}

impl<'a> HighsOptionValue for &'a str {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> HighsInt {
        match CString::new(self) {
            Ok(value) => {
                Highs_setStringOptionValue(highs, option, value.as_ptr())
            }
            Err(_) => STATUS_ERROR,
        }
    }
}

fn bound_value<N: Into<f64> + Copy>(b: Bound<&N>) -> Option<f64> {
    match b {
        Bound::Included(v) | Bound::Excluded(v) => Some((*v).into()),
        Bound::Unbounded => None,
    }
}

fn c(n: usize) -> Result<HighsInt, TryFromIntError> {
    n.try_into()
}

macro_rules! highs_call {
    ($function_name:ident ($($param:expr),+)) => {
        try_handle_status(
            $function_name($($param),+),
            stringify!($function_name)
        )
    }
}

/// A mixed-integer linear problem, assembled row by row. Columns are
/// continuous unless added through [`Problem::add_integer_column`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Problem {
    pub num_col: usize,
    pub num_row: usize,
    pub num_nz: usize,
    pub col_cost: Vec<f64>,
    pub col_lower: Vec<f64>,
    pub col_upper: Vec<f64>,
    pub integrality: Vec<bool>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,
    pub offset: f64,
    columns: Vec<(Vec<usize>, Vec<f64>)>,
}

impl Problem {
    /// Create a new problem instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint `bounds.start <= sum(factor * col) <= bounds.end`
    /// and returns its row index.
    pub fn add_row<B: RangeBounds<f64>, I: IntoIterator<Item = (usize, f64)>>(
        &mut self,
        bounds: B,
        row_factors: I,
    ) -> usize {
        let row = self.num_row;
        for (col, factor) in row_factors {
            let c = &mut self.columns[col];
            c.0.push(row);
            c.1.push(factor);
            self.num_nz += 1;
        }
        let low =
            bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY);
        let high = bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY);
        self.row_lower.push(low);
        self.row_upper.push(high);
        self.num_row += 1;
        row
    }

    pub fn add_column<B: RangeBounds<f64>>(
        &mut self,
        col_factor: f64,
        bounds: B,
    ) -> usize {
        self.push_column(col_factor, bounds, false)
    }

    pub fn add_integer_column<B: RangeBounds<f64>>(
        &mut self,
        col_factor: f64,
        bounds: B,
    ) -> usize {
        self.push_column(col_factor, bounds, true)
    }

    fn push_column<B: RangeBounds<f64>>(
        &mut self,
        col_factor: f64,
        bounds: B,
        integer: bool,
    ) -> usize {
        self.col_cost.push(col_factor);
        let low =
            bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY);
        let high = bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY);
        self.col_lower.push(low);
        self.col_upper.push(high);
        self.integrality.push(integer);
        self.columns.push((vec![], vec![]));
        let old_col_count = self.num_col;
        self.num_col += 1;
        old_col_count
    }

    /// Whether any column is integer constrained
    pub fn is_mip(&self) -> bool {
        self.integrality.iter().any(|i| *i)
    }

    fn to_compressed_matrix_form(
        &self,
    ) -> Result<(Vec<HighsInt>, Vec<HighsInt>, Vec<f64>), TryFromIntError>
    {
        let mut astart = Vec::with_capacity(self.num_col + 1);
        astart.push(0);
        let mut aindex = Vec::with_capacity(self.num_nz);
        let mut avalue = Vec::with_capacity(self.num_nz);
        for (row_indices, factors) in self.columns.iter() {
            for row in row_indices.iter() {
                aindex.push(c(*row)?);
            }
            avalue.extend_from_slice(factors);
            astart.push(c(aindex.len())?);
        }
        Ok((astart, aindex, avalue))
    }
}

#[derive(Debug)]
struct HighsPtr(*mut c_void);

impl Drop for HighsPtr {
    fn drop(&mut self) {
        unsafe { Highs_destroy(self.0) }
    }
}

impl Default for HighsPtr {
    fn default() -> Self {
        Self(unsafe { Highs_create() })
    }
}

impl HighsPtr {
    // Needed until https://github.com/ERGO-Code/HiGHS/issues/479 is fixed
    unsafe fn unsafe_mut_ptr(&self) -> *mut c_void {
        self.0
    }

    fn mut_ptr(&mut self) -> *mut c_void {
        self.0
    }

    /// Prevents writing anything to the standard output when solving the model
    fn make_quiet(&mut self) -> Result<(), HighsStatus> {
        // setting log_file seems to cause a double free in Highs.
        // See https://github.com/rust-or/highs/issues/3
        self.set_option("output_flag", false)?;
        self.set_option("log_to_console", false)
    }

    /// Set a custom parameter on the model
    fn set_option<V: HighsOptionValue>(
        &mut self,
        option: &str,
        value: V,
    ) -> Result<(), HighsStatus> {
        let c_str = CString::new(option).map_err(|_| HighsStatus::Error)?;
        let status =
            unsafe { value.apply_to_highs(self.mut_ptr(), c_str.as_ptr()) };
        try_handle_status(status, "Highs_setOptionValue")?;
        Ok(())
    }

    /// Number of variables
    fn num_cols(&self) -> Result<usize, TryFromIntError> {
        let n = unsafe { Highs_getNumCols(self.0) };
        n.try_into()
    }

    /// Number of constraints
    fn num_rows(&self) -> Result<usize, TryFromIntError> {
        let n = unsafe { Highs_getNumRows(self.0) };
        n.try_into()
    }
}

fn try_handle_status(
    status: HighsInt,
    msg: &str,
) -> Result<HighsStatus, HighsStatus> {
    match HighsStatus::try_from(status)? {
        status @ HighsStatus::OK => Ok(status),
        status @ HighsStatus::Warning => {
            println!("HiGHS emitted a warning: {}", msg);
            Ok(status)
        }
        error => Err(error),
    }
}

/// Whether to maximize or minimize the objective function
#[repr(C)]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Sense {
    /// max
    Maximise = OBJECTIVE_SENSE_MAXIMIZE as isize,
    /// min
    Minimise = OBJECTIVE_SENSE_MINIMIZE as isize,
}

/// A model to solve
#[derive(Debug)]
pub struct Model {
    highs: HighsPtr,
}

impl Model {
    /// Loads the problem into a fresh, quiet HiGHS instance (but doesn't
    /// solve it yet). Problems with integer columns are passed as MIPs.
    pub fn try_new(
        problem: &Problem,
        sense: Sense,
    ) -> Result<Self, HighsStatus> {
        let mut highs = HighsPtr::default();
        highs.make_quiet()?;
        let (astart, aindex, avalue) = problem.to_compressed_matrix_form()?;
        if problem.is_mip() {
            let integrality: Vec<HighsInt> = problem
                .integrality
                .iter()
                .map(|integer| if *integer { 1 } else { 0 })
                .collect();
            unsafe {
                highs_call!(Highs_passMip(
                    highs.mut_ptr(),
                    c(problem.num_col)?,
                    c(problem.num_row)?,
                    c(problem.num_nz)?,
                    MATRIX_FORMAT_COLUMN_WISE,
                    sense as HighsInt,
                    problem.offset,
                    problem.col_cost.as_ptr(),
                    problem.col_lower.as_ptr(),
                    problem.col_upper.as_ptr(),
                    problem.row_lower.as_ptr(),
                    problem.row_upper.as_ptr(),
                    astart.as_ptr(),
                    aindex.as_ptr(),
                    avalue.as_ptr(),
                    integrality.as_ptr()
                ))
            }?;
        } else {
            unsafe {
                highs_call!(Highs_passLp(
                    highs.mut_ptr(),
                    c(problem.num_col)?,
                    c(problem.num_row)?,
                    c(problem.num_nz)?,
                    MATRIX_FORMAT_COLUMN_WISE,
                    sense as HighsInt,
                    problem.offset,
                    problem.col_cost.as_ptr(),
                    problem.col_lower.as_ptr(),
                    problem.col_upper.as_ptr(),
                    problem.row_lower.as_ptr(),
                    problem.row_upper.as_ptr(),
                    astart.as_ptr(),
                    aindex.as_ptr(),
                    avalue.as_ptr()
                ))
            }?;
        }
        Ok(Self { highs })
    }

    pub fn set_option<V: HighsOptionValue>(
        &mut self,
        option: &str,
        value: V,
    ) -> Result<(), HighsStatus> {
        self.highs.set_option(option, value)
    }

    /// Find the optimal value for the problem, return an error if the
    /// problem is incoherent
    pub fn try_solve(&mut self) -> Result<(), HighsStatus> {
        unsafe { highs_call!(Highs_run(self.highs.mut_ptr())) }?;
        Ok(())
    }

    /// The status of the solution. Should be Optimal if everything went well.
    pub fn status(&self) -> Result<HighsModelStatus, InvalidStatus> {
        let model_status =
            unsafe { Highs_getModelStatus(self.highs.unsafe_mut_ptr()) };
        HighsModelStatus::try_from(model_status)
    }

    pub fn get_objective_value(&self) -> f64 {
        unsafe { Highs_getObjectiveValue(self.highs.unsafe_mut_ptr()) }
    }

    /// Get the primal solution of the problem
    pub fn get_solution(&self) -> Result<Solution, HighsStatus> {
        let cols = self.highs.num_cols()?;
        let rows = self.highs.num_rows()?;
        let mut colvalue: Vec<f64> = vec![0.; cols];
        let mut coldual: Vec<f64> = vec![0.; cols];
        let mut rowvalue: Vec<f64> = vec![0.; rows];
        let mut rowdual: Vec<f64> = vec![0.; rows];

        unsafe {
            highs_call!(Highs_getSolution(
                self.highs.unsafe_mut_ptr(),
                colvalue.as_mut_ptr(),
                coldual.as_mut_ptr(),
                rowvalue.as_mut_ptr(),
                rowdual.as_mut_ptr()
            ))
        }?;

        Ok(Solution { colvalue })
    }
}

/// Concrete primal values of the solution
#[derive(Clone, Debug)]
pub struct Solution {
    pub colvalue: Vec<f64>,
}
