use ndarray as nd;

pub type ObjectId = i64;
pub type TrackId = i64;

pub type Matrixd = nd::Array2<f64>;
