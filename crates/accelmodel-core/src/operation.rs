use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, AnalysisResult, ElemType, OperationId, ShardDim, ShardingConfig};

/// Kind of operation submitted for analysis.
///
/// Only [OperationKind::Matmul] is modeled, the other kinds are recognized so that they can be
/// rejected with a precise error.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// `[B, D] x [D, F] -> [B, F]`
    #[display("matmul")]
    #[serde(rename = "matmul")]
    Matmul,
    /// 2D convolution.
    #[display("conv2d")]
    #[serde(rename = "conv2d")]
    Conv2d,
    /// Elementwise operation.
    #[display("elementwise")]
    #[serde(rename = "elementwise")]
    Elementwise,
}

/// Shape and element type of one operand.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperandDescriptor {
    /// `(rows, cols)`
    pub shape: [usize; 2],
    /// Element type of the operand.
    pub elem: ElemType,
}

impl OperandDescriptor {
    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.shape[1]
    }

    /// Size of the given dimension.
    pub fn dim(&self, dim: ShardDim) -> usize {
        match dim {
            ShardDim::Rows => self.rows(),
            ShardDim::Cols => self.cols(),
        }
    }

    /// Total number of elements, counted in f64 so that huge shapes can't overflow.
    pub fn num_elements(&self) -> f64 {
        self.shape.iter().map(|&dim| dim as f64).product()
    }

    /// Bytes needed to store the operand.
    pub fn bytes(&self) -> f64 {
        self.num_elements() * self.elem.size_bytes()
    }

    fn with_dim(mut self, dim: ShardDim, value: usize) -> Self {
        match dim {
            ShardDim::Rows => self.shape[0] = value,
            ShardDim::Cols => self.shape[1] = value,
        }
        self
    }
}

/// Problem sizes of a matmul, `[b, d] x [d, f] -> [b, f]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatmulDims {
    /// Rows of the lhs, usually the batch.
    pub b: usize,
    /// Contraction dimension.
    pub d: usize,
    /// Columns of the rhs.
    pub f: usize,
}

/// Byte footprint of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationBytes {
    /// Bytes of the lhs operand.
    pub lhs: f64,
    /// Bytes of the rhs operand.
    pub rhs: f64,
    /// Bytes of the output.
    pub out: f64,
    /// `lhs + rhs + out`
    pub total: f64,
}

/// A single matrix operation submitted for analysis. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixOperation {
    id: OperationId,
    kind: OperationKind,
    lhs: OperandDescriptor,
    rhs: OperandDescriptor,
    out_elem: ElemType,
}

impl MatrixOperation {
    /// Create a new operation with a fresh identifier.
    ///
    /// Every dimension must be positive and, for a matmul, the lhs columns must match the rhs
    /// rows.
    pub fn new(
        kind: OperationKind,
        lhs: OperandDescriptor,
        rhs: OperandDescriptor,
        out_elem: ElemType,
    ) -> AnalysisResult<Self> {
        if let Some((name, operand)) = [("lhs", &lhs), ("rhs", &rhs)]
            .into_iter()
            .find(|(_, operand)| operand.shape.contains(&0))
        {
            return Err(AnalysisError::InvalidOperation {
                reason: format!("{name} shape {:?} has a zero dimension", operand.shape),
            });
        }

        if kind == OperationKind::Matmul && lhs.cols() != rhs.rows() {
            return Err(AnalysisError::InvalidOperation {
                reason: format!(
                    "lhs columns ({}) must match rhs rows ({})",
                    lhs.cols(),
                    rhs.rows()
                ),
            });
        }

        Ok(Self {
            id: OperationId::new(),
            kind,
            lhs,
            rhs,
            out_elem,
        })
    }

    /// Create a matmul operation.
    pub fn matmul(
        lhs: OperandDescriptor,
        rhs: OperandDescriptor,
        out_elem: ElemType,
    ) -> AnalysisResult<Self> {
        Self::new(OperationKind::Matmul, lhs, rhs, out_elem)
    }

    /// The identifier of the operation.
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// The kind of the operation.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The lhs operand.
    pub fn lhs(&self) -> &OperandDescriptor {
        &self.lhs
    }

    /// The rhs operand.
    pub fn rhs(&self) -> &OperandDescriptor {
        &self.rhs
    }

    /// The output element type.
    pub fn out_elem(&self) -> ElemType {
        self.out_elem
    }

    /// Problem sizes, taking the contraction dimension from the lhs.
    pub fn dims(&self) -> MatmulDims {
        MatmulDims {
            b: self.lhs.rows(),
            d: self.lhs.cols(),
            f: self.rhs.cols(),
        }
    }

    /// Floating point operations, `2·B·D·F`.
    pub fn flops(&self) -> AnalysisResult<f64> {
        self.ensure_matmul()?;
        let MatmulDims { b, d, f } = self.dims();

        Ok(2.0 * b as f64 * d as f64 * f as f64)
    }

    /// Byte footprint of both operands and the output.
    pub fn bytes(&self) -> OperationBytes {
        let lhs = self.lhs.bytes();
        let rhs = self.rhs.bytes();
        let out = self.lhs.rows() as f64 * self.rhs.cols() as f64 * self.out_elem.size_bytes();

        OperationBytes {
            lhs,
            rhs,
            out,
            total: lhs + rhs + out,
        }
    }

    /// FLOPs per byte moved. Returns [f64::INFINITY] when no bytes are moved.
    pub fn arithmetic_intensity(&self) -> AnalysisResult<f64> {
        let flops = self.flops()?;
        let total = self.bytes().total;

        if total == 0.0 {
            return Ok(f64::INFINITY);
        }

        Ok(flops / total)
    }

    /// Per-device copy of the operation where each configured dimension is replaced by its
    /// shard size, `ceil(dim / num_devices)`.
    ///
    /// The copy gets its own identifier and is not meant to be registered.
    pub fn sharded(&self, config: &ShardingConfig) -> AnalysisResult<Self> {
        config.validate()?;

        let shard = |operand: OperandDescriptor, dim: Option<ShardDim>| match dim {
            Some(dim) => {
                let size = operand.dim(dim).div_ceil(config.num_devices as usize);
                operand.with_dim(dim, size)
            }
            None => operand,
        };

        Ok(Self {
            id: OperationId::new(),
            kind: self.kind,
            lhs: shard(self.lhs, config.lhs_dim),
            rhs: shard(self.rhs, config.rhs_dim),
            out_elem: self.out_elem,
        })
    }

    fn ensure_matmul(&self) -> AnalysisResult<()> {
        match self.kind {
            OperationKind::Matmul => Ok(()),
            kind => Err(AnalysisError::UnsupportedOperation { kind }),
        }
    }
}
