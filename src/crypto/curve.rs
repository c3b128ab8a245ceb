//! Short Weierstrass curves `y² = x³ + ax + b` over prime fields.
//!
//! Covers the ECDSA keys the fixed-curve backends do not: the Brainpool
//! curves of RFC 5639, and keys that carry their domain parameters explicitly
//! (X9.62 `SpecifiedECDomain`), which several countries use for CSCAs and
//! DSCs. Points are kept in Jacobian coordinates, `(X/Z², Y/Z³)` with `Z = 0`
//! at infinity.
//!
//! Verification only: every input is public, so none of this is constant
//! time.

use {
    super::SignatureError,
    crate::asn1::UnsupportedAlgorithm,
    ::rsa::BigUint,
    der::{
        asn1::{Any, BitString, ObjectIdentifier as Oid, OctetString, Uint},
        Sequence,
    },
    hex_literal::hex,
};

const BRAINPOOL_P256R1: Oid = Oid::new_unwrap("1.3.36.3.3.2.8.1.1.7");
const BRAINPOOL_P384R1: Oid = Oid::new_unwrap("1.3.36.3.3.2.8.1.1.11");
const BRAINPOOL_P512R1: Oid = Oid::new_unwrap("1.3.36.3.3.2.8.1.1.13");

const ID_PRIME_FIELD: Oid = Oid::new_unwrap("1.2.840.10045.1.1");

struct Domain {
    p:  &'static [u8],
    a:  &'static [u8],
    b:  &'static [u8],
    gx: &'static [u8],
    gy: &'static [u8],
    n:  &'static [u8],
}

// RFC 5639 3.4
const P256R1: Domain = Domain {
    p:  &hex!("A9FB57DBA1EEA9BC3E660A909D838D726E3BF623D52620282013481D1F6E5377"),
    a:  &hex!("7D5A0975FC2C3057EEF67530417AFFE7FB8055C126DC5C6CE94A4B44F330B5D9"),
    b:  &hex!("26DC5C6CE94A4B44F330B5D9BBD77CBF958416295CF7E1CE6BCCDC18FF8C07B6"),
    gx: &hex!("8BD2AEB9CB7E57CB2C4B482FFC81B7AFB9DE27E1E3BD23C23A4453BD9ACE3262"),
    gy: &hex!("547EF835C3DAC4FD97F8461A14611DC9C27745132DED8E545C1D54C72F046997"),
    n:  &hex!("A9FB57DBA1EEA9BC3E660A909D838D718C397AA3B561A6F7901E0E82974856A7"),
};

// RFC 5639 3.6
const P384R1: Domain = Domain {
    p:  &hex!("8CB91E82A3386D280F5D6F7E50E641DF152F7109ED5456B412B1DA197FB71123ACD3A729901D1A71874700133107EC53"),
    a:  &hex!("7BC382C63D8C150C3C72080ACE05AFA0C2BEA28E4FB22787139165EFBA91F90F8AA5814A503AD4EB04A8C7DD22CE2826"),
    b:  &hex!("04A8C7DD22CE28268B39B55416F0447C2FB77DE107DCD2A62E880EA53EEB62D57CB4390295DBC9943AB78696FA504C11"),
    gx: &hex!("1D1C64F068CF45FFA2A63A81B7C13F6B8847A3E77EF14FE3DB7FCAFE0CBD10E8E826E03436D646AAEF87B2E247D4AF1E"),
    gy: &hex!("8ABE1D7520F9C2A45CB1EB8E95CFD55262B70B29FEEC5864E19C054FF99129280E4646217791811142820341263C5315"),
    n:  &hex!("8CB91E82A3386D280F5D6F7E50E641DF152F7109ED5456B31F166E6CAC0425A7CF3AB6AF6B7FC3103B883202E9046565"),
};

// RFC 5639 3.7
const P512R1: Domain = Domain {
    p:  &hex!("AADD9DB8DBE9C48B3FD4E6AE33C9FC07CB308DB3B3C9D20ED6639CCA703308717D4D9B009BC66842AECDA12AE6A380E62881FF2F2D82C68528AA6056583A48F3"),
    a:  &hex!("7830A3318B603B89E2327145AC234CC594CBDD8D3DF91610A83441CAEA9863BC2DED5D5AA8253AA10A2EF1C98B9AC8B57F1117A72BF2C7B9E7C1AC4D77FC94CA"),
    b:  &hex!("3DF91610A83441CAEA9863BC2DED5D5AA8253AA10A2EF1C98B9AC8B57F1117A72BF2C7B9E7C1AC4D77FC94CADC083E67984050B75EBAE5DD2809BD638016F723"),
    gx: &hex!("81AEE4BDD82ED9645A21322E9C4C6A9385ED9F70B5D916C1B43B62EEF4D0098EFF3B1F78E2D0D48D50D1687B93B97D5F7C6D5047406A5E688B352209BCB9F822"),
    gy: &hex!("7DDE385D566332ECC0EABFA9CF7822FDF209F70024A57B1AA000C55B881F8111B2DCDE494A5F485E5BCA4BD88A2763AED1CA2B2FA8F0540678CD1E0F3AD80892"),
    n:  &hex!("AADD9DB8DBE9C48B3FD4E6AE33C9FC07CB308DB3B3C9D20ED6639CCA70330870553E5C414CA92619418661197FAC10471DB1D381085DDADDB58796829CA90069"),
};

// ANSI X9.62 / RFC 3279 2.3.5
// SpecifiedECDomain ::= SEQUENCE {
//   version   INTEGER { ecpVer1(1) },
//   fieldID   FieldID,
//   curve     Curve,
//   base      ECPoint,
//   order     INTEGER,
//   cofactor  INTEGER OPTIONAL }
#[derive(Clone, Debug, Sequence)]
struct SpecifiedEcDomain {
    version:  u8,
    field_id: FieldId,
    curve:    CurveCoefficients,
    base:     OctetString,
    order:    Uint,
    cofactor: Option<Uint>,
}

#[derive(Clone, Debug, Sequence)]
struct FieldId {
    field_type: Oid,
    parameters: Any,
}

#[derive(Clone, Debug, Sequence)]
struct CurveCoefficients {
    a:    OctetString,
    b:    OctetString,
    seed: Option<BitString>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Curve {
    p:  BigUint,
    a:  BigUint,
    b:  BigUint,
    gx: BigUint,
    gy: BigUint,
    n:  BigUint,
}

#[derive(Clone, Debug)]
struct Jacobian {
    x: BigUint,
    y: BigUint,
    z: BigUint,
}

/// A public point on a [`Curve`].
#[derive(Clone, Debug)]
pub struct CurveKey {
    curve: Curve,
    x:     BigUint,
    y:     BigUint,
}

fn int(n: u32) -> BigUint {
    BigUint::from(n)
}

fn is_zero(x: &BigUint) -> bool {
    x.bits() == 0
}

/// Bit `i` of `bytes`, a big-endian integer, counting from the least
/// significant bit.
fn bit(bytes: &[u8], i: usize) -> bool {
    let index = i / 8;
    index < bytes.len() && (bytes[bytes.len() - 1 - index] >> (i % 8)) & 1 == 1
}

impl Jacobian {
    fn infinity() -> Self {
        Self {
            x: int(1),
            y: int(1),
            z: int(0),
        }
    }

    fn affine(x: &BigUint, y: &BigUint) -> Self {
        Self {
            x: x.clone(),
            y: y.clone(),
            z: int(1),
        }
    }

    fn is_infinity(&self) -> bool {
        is_zero(&self.z)
    }
}

impl Curve {
    /// The curve registered under `oid`, if it is one of the Brainpool `r1`
    /// curves.
    pub fn named(oid: Oid) -> Option<Self> {
        let domain = match oid {
            BRAINPOOL_P256R1 => &P256R1,
            BRAINPOOL_P384R1 => &P384R1,
            BRAINPOOL_P512R1 => &P512R1,
            _ => return None,
        };
        let bytes = BigUint::from_bytes_be;
        Some(Self {
            p:  bytes(domain.p),
            a:  bytes(domain.a),
            b:  bytes(domain.b),
            gx: bytes(domain.gx),
            gy: bytes(domain.gy),
            n:  bytes(domain.n),
        })
    }

    /// Decodes `SpecifiedECDomain` parameters. Only prime fields are
    /// supported.
    pub fn from_explicit(params: &Any) -> Result<Self, SignatureError> {
        let domain: SpecifiedEcDomain = params
            .decode_as()
            .map_err(|_| SignatureError::InvalidKey)?;
        if domain.field_id.field_type != ID_PRIME_FIELD {
            return Err(UnsupportedAlgorithm(domain.field_id.field_type).into());
        }
        if domain.version != 1 {
            return Err(SignatureError::InvalidKey);
        }
        let p = domain
            .field_id
            .parameters
            .decode_as::<Uint>()
            .map_err(|_| SignatureError::InvalidKey)?;

        let mut curve = Self {
            p:  BigUint::from_bytes_be(p.as_bytes()),
            a:  BigUint::from_bytes_be(domain.curve.a.as_bytes()),
            b:  BigUint::from_bytes_be(domain.curve.b.as_bytes()),
            gx: int(0),
            gy: int(0),
            n:  BigUint::from_bytes_be(domain.order.as_bytes()),
        };
        if curve.p <= int(3) || curve.a >= curve.p || curve.b >= curve.p || curve.n <= int(1) {
            return Err(SignatureError::InvalidKey);
        }
        let (gx, gy) = curve.decode_point(domain.base.as_bytes())?;
        curve.gx = gx;
        curve.gy = gy;
        Ok(curve)
    }

    /// Size of a field element in bytes.
    fn field_len(&self) -> usize {
        self.p.bits().div_ceil(8)
    }

    fn add(&self, x: &BigUint, y: &BigUint) -> BigUint {
        (x + y) % &self.p
    }

    fn sub(&self, x: &BigUint, y: &BigUint) -> BigUint {
        (x + &self.p - y) % &self.p
    }

    fn mul(&self, x: &BigUint, y: &BigUint) -> BigUint {
        (x * y) % &self.p
    }

    fn inv(&self, x: &BigUint) -> BigUint {
        x.modpow(&(&self.p - &int(2)), &self.p)
    }

    /// `x³ + ax + b`
    fn rhs(&self, x: &BigUint) -> BigUint {
        let x3 = self.mul(&self.mul(x, x), x);
        self.add(&self.add(&x3, &self.mul(&self.a, x)), &self.b)
    }

    /// SEC 1 2.3.4, uncompressed or compressed.
    fn decode_point(&self, bytes: &[u8]) -> Result<(BigUint, BigUint), SignatureError> {
        let len = self.field_len();
        let (x, y) = match bytes {
            [0x04, rest @ ..] if rest.len() == 2 * len => (
                BigUint::from_bytes_be(&rest[..len]),
                BigUint::from_bytes_be(&rest[len..]),
            ),
            [tag @ (0x02 | 0x03), rest @ ..] if rest.len() == len => {
                let x = BigUint::from_bytes_be(rest);
                let y = self.lift_x(&x, *tag == 0x03)?;
                (x, y)
            }
            _ => return Err(SignatureError::InvalidKey),
        };
        if x >= self.p || y >= self.p || self.mul(&y, &y) != self.rhs(&x) {
            return Err(SignatureError::InvalidKey);
        }
        Ok((x, y))
    }

    /// Recovers `y` from `x` and its parity. Needs `p ≡ 3 (mod 4)`, which
    /// holds for every Brainpool prime.
    fn lift_x(&self, x: &BigUint, odd: bool) -> Result<BigUint, SignatureError> {
        if &self.p % &int(4) != int(3) {
            return Err(SignatureError::InvalidKey);
        }
        let rhs = self.rhs(x);
        let y = rhs.modpow(&((&self.p + &int(1)) / &int(4)), &self.p);
        if self.mul(&y, &y) != rhs {
            return Err(SignatureError::InvalidKey);
        }
        let y_odd = y.to_bytes_be().last().is_some_and(|b| b & 1 == 1);
        Ok(if y_odd == odd { y } else { self.sub(&int(0), &y) })
    }

    // dbl-2007-bl
    fn double(&self, point: &Jacobian) -> Jacobian {
        if point.is_infinity() || is_zero(&point.y) {
            return Jacobian::infinity();
        }
        let Jacobian { x, y, z } = point;
        let xx = self.mul(x, x);
        let yy = self.mul(y, y);
        let yyyy = self.mul(&yy, &yy);
        let zz = self.mul(z, z);

        let t = self.add(x, &yy);
        let t = self.sub(&self.sub(&self.mul(&t, &t), &xx), &yyyy);
        let s = self.add(&t, &t);
        let m = self.add(&self.add(&self.add(&xx, &xx), &xx), &self.mul(&self.a, &self.mul(&zz, &zz)));

        let x3 = self.sub(&self.mul(&m, &m), &self.add(&s, &s));
        let yyyy8 = self.add(&yyyy, &yyyy);
        let yyyy8 = self.add(&yyyy8, &yyyy8);
        let yyyy8 = self.add(&yyyy8, &yyyy8);
        let y3 = self.sub(&self.mul(&m, &self.sub(&s, &x3)), &yyyy8);
        let yz = self.add(y, z);
        let z3 = self.sub(&self.sub(&self.mul(&yz, &yz), &yy), &zz);
        Jacobian {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    // add-2007-bl
    fn add_points(&self, p1: &Jacobian, p2: &Jacobian) -> Jacobian {
        if p1.is_infinity() {
            return p2.clone();
        }
        if p2.is_infinity() {
            return p1.clone();
        }
        let z1z1 = self.mul(&p1.z, &p1.z);
        let z2z2 = self.mul(&p2.z, &p2.z);
        let u1 = self.mul(&p1.x, &z2z2);
        let u2 = self.mul(&p2.x, &z1z1);
        let s1 = self.mul(&self.mul(&p1.y, &p2.z), &z2z2);
        let s2 = self.mul(&self.mul(&p2.y, &p1.z), &z1z1);
        if u1 == u2 {
            return if s1 == s2 {
                self.double(p1)
            } else {
                Jacobian::infinity()
            };
        }

        let h = self.sub(&u2, &u1);
        let h2 = self.add(&h, &h);
        let i = self.mul(&h2, &h2);
        let j = self.mul(&h, &i);
        let r = self.sub(&s2, &s1);
        let r = self.add(&r, &r);
        let v = self.mul(&u1, &i);

        let x3 = self.sub(&self.sub(&self.mul(&r, &r), &j), &self.add(&v, &v));
        let s1j = self.mul(&s1, &j);
        let y3 = self.sub(&self.mul(&r, &self.sub(&v, &x3)), &self.add(&s1j, &s1j));
        let zz = self.add(&p1.z, &p2.z);
        let z3 = self.mul(&self.sub(&self.sub(&self.mul(&zz, &zz), &z1z1), &z2z2), &h);
        Jacobian {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    /// `u1·G + u2·Q`, one shared double-and-add pass.
    fn mul_add(&self, u1: &BigUint, u2: &BigUint, q: &Jacobian) -> Jacobian {
        let g = Jacobian::affine(&self.gx, &self.gy);
        let g_plus_q = self.add_points(&g, q);
        let (k1, k2) = (u1.to_bytes_be(), u2.to_bytes_be());

        let mut acc = Jacobian::infinity();
        for i in (0..u1.bits().max(u2.bits())).rev() {
            acc = self.double(&acc);
            let addend = match (bit(&k1, i), bit(&k2, i)) {
                (true, true) => &g_plus_q,
                (true, false) => &g,
                (false, true) => q,
                (false, false) => continue,
            };
            acc = self.add_points(&acc, addend);
        }
        acc
    }

    fn affine_x(&self, point: &Jacobian) -> BigUint {
        let z_inv = self.inv(&point.z);
        self.mul(&point.x, &self.mul(&z_inv, &z_inv))
    }
}

impl CurveKey {
    /// Decodes the SEC 1 encoded point from a `subjectPublicKey`.
    pub fn from_sec1(curve: Curve, bytes: &[u8]) -> Result<Self, SignatureError> {
        let (x, y) = curve.decode_point(bytes)?;
        Ok(Self { curve, x, y })
    }

    /// ECDSA verification, SEC 1 4.1.4, over an already computed digest.
    pub fn verify_prehash(&self, digest: &[u8], r: &BigUint, s: &BigUint) -> bool {
        let n = &self.curve.n;
        let one = int(1);
        if r < &one || r >= n || s < &one || s >= n {
            return false;
        }

        // Leftmost bits of the digest, as many as the order has.
        let mut e = BigUint::from_bytes_be(digest);
        let digest_bits = digest.len() * 8;
        if digest_bits > n.bits() {
            e = e >> (digest_bits - n.bits());
        }

        let w = s.modpow(&(n - &int(2)), n);
        let u1 = (&e * &w) % n;
        let u2 = (r * &w) % n;
        let point = self
            .curve
            .mul_add(&u1, &u2, &Jacobian::affine(&self.x, &self.y));
        if point.is_infinity() {
            return false;
        }
        &(self.curve.affine_x(&point) % n) == r
    }
}
