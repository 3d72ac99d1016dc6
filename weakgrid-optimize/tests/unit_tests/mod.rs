mod lbfgs;
