mod energy;
mod field;
mod gradient;
mod killing;
