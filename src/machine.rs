use num_complex::Complex64;

/// A variational wavefunction, seen by the samplers only through amplitude queries.
///
/// Samplers never assume anything about how the amplitudes are computed. A machine with
/// internal mutable parameters must keep them fixed for the duration of a sweep.
pub trait Machine {
    /// Number of sites in a configuration.
    fn n_visible(&self) -> usize;

    /// The allowed values of a single site.
    fn local_states(&self) -> &[f64];

    /// The log amplitude `log psi(v)`.
    fn log_val(&self, v: &[f64]) -> Complex64;

    /// `log psi(v') - log psi(v)` where `v'` is `v` with `v'[tochange[k]] = newconf[k]`.
    ///
    /// The default materializes `v'`, machines with lookup tables should override it.
    fn log_val_diff(&self, v: &[f64], tochange: &[usize], newconf: &[f64]) -> Complex64 {
        let mut v_new = v.to_vec();
        update_conf(&mut v_new, tochange, newconf);
        self.log_val(&v_new) - self.log_val(v)
    }
}

impl<M: Machine + ?Sized> Machine for &M {
    fn n_visible(&self) -> usize {
        (**self).n_visible()
    }

    fn local_states(&self) -> &[f64] {
        (**self).local_states()
    }

    fn log_val(&self, v: &[f64]) -> Complex64 {
        (**self).log_val(v)
    }

    fn log_val_diff(&self, v: &[f64], tochange: &[usize], newconf: &[f64]) -> Complex64 {
        (**self).log_val_diff(v, tochange, newconf)
    }
}

/// Write `newconf` into `v` at the sites listed in `tochange`.
pub fn update_conf(v: &mut [f64], tochange: &[usize], newconf: &[f64]) {
    tochange
        .iter()
        .zip(newconf.iter())
        .for_each(|(site, value)| v[*site] = *value);
}

#[cfg(test)]
pub(crate) mod test_machines {
    use super::*;

    /// Every configuration has the same amplitude.
    #[derive(Debug)]
    pub(crate) struct Flat {
        pub(crate) n: usize,
        pub(crate) local: Vec<f64>,
    }

    impl Machine for Flat {
        fn n_visible(&self) -> usize {
            self.n
        }
        fn local_states(&self) -> &[f64] {
            &self.local
        }
        fn log_val(&self, _v: &[f64]) -> Complex64 {
            Complex64::new(0.3, 1.1)
        }
    }

    /// `log psi = sum_i h_i v_i + J sum_i v_i v_{i+1}` with a complex phase.
    #[derive(Debug)]
    pub(crate) struct Ising {
        pub(crate) fields: Vec<f64>,
        pub(crate) coupling: f64,
        pub(crate) local: Vec<f64>,
    }

    impl Machine for Ising {
        fn n_visible(&self) -> usize {
            self.fields.len()
        }
        fn local_states(&self) -> &[f64] {
            &self.local
        }
        fn log_val(&self, v: &[f64]) -> Complex64 {
            let field: f64 = v.iter().zip(self.fields.iter()).map(|(a, b)| a * b).sum();
            let bonds: f64 = v.windows(2).map(|w| w[0] * w[1]).sum();
            Complex64::new(field + self.coupling * bonds, 0.25 * v[0])
        }
    }

    #[test]
    fn default_diff_matches_log_vals() {
        let m = Ising {
            fields: vec![0.1, -0.4, 0.3],
            coupling: 0.7,
            local: vec![-1.0, 1.0],
        };
        let v = [1.0, -1.0, 1.0];
        let diff = m.log_val_diff(&v, &[1, 2], &[1.0, -1.0]);
        let expected = m.log_val(&[1.0, 1.0, -1.0]) - m.log_val(&v);
        assert!((diff - expected).norm() < 1e-12);
    }
}
