//! Analysis context.
//!
//! An [`Analysis`] is bound to one [`Program`] and owns every memo table used while analyzing
//! it: closed forms of moments, branches of monomials and bounds of monomials. Bound inference
//! and the invariance check are implemented on top of it in [`bounds`][crate::bounds] and
//! [`invariance`][crate::invariance].
use log::debug;

use crate::bounds::Bounds;
use crate::cases::{branches_of_monom, Branch};
use crate::error::{Error, Result};
use crate::expr::Monomial;
use crate::moments::Moments;
use crate::program::Program;
use crate::store::Store;

pub struct Analysis<'p> {
    pub(crate) program: &'p Program,
    pub(crate) moments: Moments<'p>,
    pub(crate) bounds: Store<Monomial, Bounds>,
    pub(crate) branches: Store<Monomial, Vec<Branch>>,
}

impl<'p> Analysis<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            moments: Moments::new(program),
            bounds: Store::new(),
            branches: Store::new(),
        }
    }

    /// Rebinds the analysis to another program, forgetting everything computed so far.
    pub fn set_program(&mut self, program: &'p Program) {
        debug!("Switching analysis to a new program");
        self.program = program;
        self.moments = Moments::new(program);
        self.bounds.clear();
        self.branches.clear();
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn moments(&mut self) -> &mut Moments<'p> {
        &mut self.moments
    }

    pub fn bound_store(&self) -> &Store<Monomial, Bounds> {
        &self.bounds
    }

    pub fn branch_store(&self) -> &Store<Monomial, Vec<Branch>> {
        &self.branches
    }

    /// Branches of `monom`, computed on first use.
    pub fn branches_of_monom(&mut self, monom: &Monomial) -> Result<Vec<Branch>> {
        if let Some(branches) = self.branches.get(monom) {
            return Ok(branches.clone());
        }
        if !self.branches.begin(monom) {
            return Err(Error::internal(format!(
                "branches of `{}` depend on themselves",
                monom
            )));
        }
        match branches_of_monom(monom, self.program) {
            Ok(branches) => {
                self.branches.insert(monom.clone(), branches.clone());
                Ok(branches)
            }
            Err(e) => {
                self.branches.abandon(monom);
                Err(e)
            }
        }
    }
}
